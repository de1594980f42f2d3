use std::fs;
use std::path::Path;
use std::time::{Duration, SystemTime};

use doppelganger_core::fingerprint::{fingerprint_bytes, Fingerprint};
use doppelganger_core::store::Catalogue;
use doppelganger_core::{IndexEngine, SilentReporter};
use tempfile::tempdir;

/// Layout:
///   root/
///     top.txt            ("top level")
///     docs/
///       readme.txt       ("hello")
///       guide.txt        ("guide text")
///     hollow/            (no files)
fn create_test_tree(root: &Path) {
    fs::create_dir_all(root.join("docs")).unwrap();
    fs::create_dir_all(root.join("hollow")).unwrap();
    fs::write(root.join("top.txt"), "top level").unwrap();
    fs::write(root.join("docs/readme.txt"), "hello").unwrap();
    fs::write(root.join("docs/guide.txt"), "guide text").unwrap();
}

fn stored_fingerprint(catalogue_path: &Path, rel: &str) -> Option<Fingerprint> {
    let catalogue = Catalogue::open_read_only(catalogue_path).unwrap();
    catalogue
        .files()
        .unwrap()
        .into_iter()
        .find(|f| f.rel_path() == rel)
        .and_then(|f| f.fingerprint)
}

fn set_mtime(path: &Path, mtime: SystemTime) {
    let file = fs::OpenOptions::new().write(true).open(path).unwrap();
    file.set_modified(mtime).unwrap();
}

#[test]
fn update_builds_a_complete_catalogue() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("tree");
    create_test_tree(&root);

    let engine = IndexEngine::new(&root);
    let result = engine.update(&SilentReporter).unwrap();

    assert_eq!(result.files_seen, 3);
    assert_eq!(result.files_hashed, 3);
    assert_eq!(result.fingerprints_reused, 0);
    assert!(result.failed_files.is_empty());

    let catalogue = Catalogue::open_read_only(engine.catalogue_path()).unwrap();
    assert_eq!(catalogue.unfingerprinted_count().unwrap(), 0);

    let files = catalogue.files().unwrap();
    assert_eq!(files.len(), 3);
    let readme = files.iter().find(|f| f.name == "readme.txt").unwrap();
    assert_eq!(readme.parent_path, "docs");
    assert_eq!(readme.fingerprint, Some(fingerprint_bytes(b"hello")));

    // Folder records cover the root, docs, and the childless folder.
    let folders = catalogue.folders().unwrap();
    let mut paths: Vec<&str> = folders.iter().map(|f| f.path.as_str()).collect();
    paths.sort();
    assert_eq!(paths, vec!["", "docs", "hollow"]);

    let snapshot = catalogue.latest_snapshot().unwrap().unwrap();
    assert_eq!(snapshot.status, "complete");
    assert_eq!(snapshot.files_seen, 3);
}

#[test]
fn catalogue_never_indexes_itself() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("tree");
    create_test_tree(&root);

    let engine = IndexEngine::new(&root);
    engine.update(&SilentReporter).unwrap();
    // A second pass walks a root that now contains the catalogue file.
    engine.update(&SilentReporter).unwrap();

    let catalogue = Catalogue::open_read_only(engine.catalogue_path()).unwrap();
    let files = catalogue.files().unwrap();
    assert!(files.iter().all(|f| !f.name.starts_with(".doppelganger.db")));
    assert_eq!(files.len(), 3);
}

#[test]
fn unchanged_metadata_reuses_fingerprints_without_rereading() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("tree");
    fs::create_dir_all(&root).unwrap();
    let target = root.join("cached.txt");
    fs::write(&target, "original!!").unwrap();

    let engine = IndexEngine::new(&root);
    engine.update(&SilentReporter).unwrap();
    let before = stored_fingerprint(engine.catalogue_path(), "cached.txt").unwrap();
    assert_eq!(before, fingerprint_bytes(b"original!!"));

    // Rewrite the bytes but restore size and mtime exactly. If the next pass
    // trusted anything other than (size, mtime) it would notice; if it
    // re-read content it would produce the new digest. It must do neither.
    let mtime = fs::metadata(&target).unwrap().modified().unwrap();
    fs::write(&target, "hijacked!!").unwrap();
    set_mtime(&target, mtime);

    let result = engine.update(&SilentReporter).unwrap();
    assert_eq!(result.fingerprints_reused, 1);
    assert_eq!(result.files_hashed, 0);
    let after = stored_fingerprint(engine.catalogue_path(), "cached.txt").unwrap();
    assert_eq!(after, before, "stale fingerprint must be carried forward");

    // Any mtime change invalidates the record and forces a re-read.
    set_mtime(&target, mtime + Duration::from_secs(5));
    let result = engine.update(&SilentReporter).unwrap();
    assert_eq!(result.files_hashed, 1);
    let recomputed = stored_fingerprint(engine.catalogue_path(), "cached.txt").unwrap();
    assert_eq!(recomputed, fingerprint_bytes(b"hijacked!!"));
}

#[test]
fn changed_size_forces_recomputation() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("tree");
    fs::create_dir_all(&root).unwrap();
    fs::write(root.join("grow.txt"), "v1").unwrap();

    let engine = IndexEngine::new(&root);
    engine.update(&SilentReporter).unwrap();

    fs::write(root.join("grow.txt"), "version 2").unwrap();
    let result = engine.update(&SilentReporter).unwrap();

    assert_eq!(result.files_hashed, 1);
    assert_eq!(
        stored_fingerprint(engine.catalogue_path(), "grow.txt").unwrap(),
        fingerprint_bytes(b"version 2")
    );
}

#[test]
fn added_and_removed_files_are_tracked() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("tree");
    create_test_tree(&root);

    let engine = IndexEngine::new(&root);
    engine.update(&SilentReporter).unwrap();

    fs::write(root.join("docs/new.txt"), "fresh").unwrap();
    fs::remove_file(root.join("top.txt")).unwrap();

    let result = engine.update(&SilentReporter).unwrap();
    assert_eq!(result.files_seen, 3);
    assert_eq!(result.files_hashed, 1, "only the new file is hashed");
    assert_eq!(result.fingerprints_reused, 2);

    let catalogue = Catalogue::open_read_only(engine.catalogue_path()).unwrap();
    let files = catalogue.files().unwrap();
    assert!(files.iter().any(|f| f.name == "new.txt"));
    assert!(!files.iter().any(|f| f.name == "top.txt"));
}

#[test]
fn full_rebuild_rehashes_everything() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("tree");
    create_test_tree(&root);

    let engine = IndexEngine::new(&root);
    engine.update(&SilentReporter).unwrap();

    let result = engine.create(&SilentReporter).unwrap();
    assert_eq!(result.files_hashed, 3);
    assert_eq!(result.fingerprints_reused, 0);
}

#[test]
fn tree_pattern_file_excludes_entries() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("tree");
    create_test_tree(&root);
    fs::write(root.join(".doppelganger.ignore"), "docs\n*.txt\n").unwrap();

    let engine = IndexEngine::new(&root);
    let result = engine.update(&SilentReporter).unwrap();

    // top.txt matches *.txt; docs is pruned whole; the pattern file itself
    // does not match either glob and is catalogued like any other file.
    assert_eq!(result.files_seen, 1);

    let catalogue = Catalogue::open_read_only(engine.catalogue_path()).unwrap();
    let files = catalogue.files().unwrap();
    assert_eq!(files[0].name, ".doppelganger.ignore");
    let folders = catalogue.folders().unwrap();
    assert!(!folders.iter().any(|f| f.path == "docs"));
}

#[test]
fn extra_patterns_compose_with_the_tree_file() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("tree");
    create_test_tree(&root);

    let engine = IndexEngine::new(&root).with_patterns(vec!["hollow".to_string()]);
    engine.update(&SilentReporter).unwrap();

    let catalogue = Catalogue::open_read_only(engine.catalogue_path()).unwrap();
    let folders = catalogue.folders().unwrap();
    assert!(!folders.iter().any(|f| f.path == "hollow"));
}

#[test]
fn missing_root_is_a_fatal_error() {
    let tmp = tempdir().unwrap();
    let engine = IndexEngine::new(tmp.path().join("nonexistent"));
    assert!(engine.update(&SilentReporter).is_err());
}

#[test]
fn custom_catalogue_location_is_honored() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("tree");
    create_test_tree(&root);
    let location = tmp.path().join("elsewhere.db");

    let engine = IndexEngine::new(&root).with_catalogue_path(&location);
    engine.update(&SilentReporter).unwrap();

    assert!(location.exists());
    assert!(!root.join(".doppelganger.db").exists());
    let catalogue = Catalogue::open_read_only(&location).unwrap();
    assert_eq!(catalogue.files().unwrap().len(), 3);
}
