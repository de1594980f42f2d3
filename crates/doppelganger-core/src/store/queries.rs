use rusqlite::params;
use tracing::debug;

use super::models::{FileRecord, FolderRecord, SnapshotRecord};
use super::sqlite::{Catalogue, FILE_TABLE_SQL};
use crate::aggregate::FolderAggregator;
use crate::error::Error;
use crate::fingerprint::Fingerprint;
use crate::hasher::FileKey;
use crate::walker::FileMeta;

impl Catalogue {
    // ── Snapshots ────────────────────────────────────────────────

    pub fn begin_snapshot(&self) -> Result<i64, Error> {
        let now = chrono::Utc::now().to_rfc3339();
        self.connection().execute(
            "INSERT INTO snapshot (started_at, status) VALUES (?1, 'running')",
            params![now],
        )?;
        Ok(self.connection().last_insert_rowid())
    }

    #[allow(clippy::too_many_arguments)]
    pub fn finish_snapshot(
        &self,
        snapshot_id: i64,
        status: &str,
        files_seen: usize,
        bytes_seen: u64,
        files_hashed: usize,
        fingerprints_reused: usize,
        files_failed: usize,
    ) -> Result<(), Error> {
        let now = chrono::Utc::now().to_rfc3339();
        self.connection().execute(
            "UPDATE snapshot SET completed_at = ?1, status = ?2, files_seen = ?3, \
             bytes_seen = ?4, files_hashed = ?5, fingerprints_reused = ?6, files_failed = ?7 \
             WHERE id = ?8",
            params![
                now,
                status,
                files_seen as i64,
                bytes_seen as i64,
                files_hashed as i64,
                fingerprints_reused as i64,
                files_failed as i64,
                snapshot_id,
            ],
        )?;
        Ok(())
    }

    pub fn latest_snapshot(&self) -> Result<Option<SnapshotRecord>, Error> {
        let mut stmt = self.connection().prepare(
            "SELECT id, started_at, completed_at, status, files_seen, bytes_seen, \
                    files_hashed, fingerprints_reused, files_failed \
             FROM snapshot ORDER BY id DESC LIMIT 1",
        )?;
        let mut rows = stmt.query_map([], |row| {
            Ok(SnapshotRecord {
                id: row.get(0)?,
                started_at: row.get(1)?,
                completed_at: row.get(2)?,
                status: row.get(3)?,
                files_seen: row.get(4)?,
                bytes_seen: row.get(5)?,
                files_hashed: row.get(6)?,
                fingerprints_reused: row.get(7)?,
                files_failed: row.get(8)?,
            })
        })?;
        Ok(rows.next().transpose()?)
    }

    // ── File table staging ───────────────────────────────────────

    /// Set the previous file table aside and start a fresh one. The previous
    /// snapshot stays queryable as `file_old` until the carry-forward join is
    /// done with it.
    pub fn stage_previous_file_table(&self) -> Result<(), Error> {
        self.connection()
            .execute("ALTER TABLE file RENAME TO file_old", [])?;
        self.connection().execute_batch(FILE_TABLE_SQL)?;
        Ok(())
    }

    /// Drop the file table outright (the non-incremental baseline build).
    pub fn reset_file_table(&self) -> Result<(), Error> {
        self.connection()
            .execute_batch("DROP TABLE IF EXISTS file;")?;
        self.connection().execute_batch(FILE_TABLE_SQL)?;
        Ok(())
    }

    pub fn discard_previous_file_table(&self) -> Result<(), Error> {
        self.connection().execute_batch("DROP TABLE file_old;")?;
        // The fingerprint index followed the renamed table; put it back.
        self.connection().execute_batch(FILE_TABLE_SQL)?;
        Ok(())
    }

    /// Insert metadata-only rows for every walked file. No content has been
    /// touched at this point; fingerprints are all absent.
    pub fn insert_file_metadata(&self, files: &[FileMeta]) -> Result<usize, Error> {
        let mut stmt = self.connection().prepare_cached(
            "INSERT INTO file (name, parent_path, size, modified_ns, fingerprint) \
             VALUES (?1, ?2, ?3, ?4, NULL)",
        )?;
        let mut count = 0;
        for file in files {
            count += stmt.execute(params![
                file.name,
                file.parent_path,
                file.size as i64,
                file.modified_ns,
            ])?;
        }
        debug!("inserted {} walked file records", count);
        Ok(count)
    }

    /// The caching join: copy the previous snapshot's fingerprint onto every
    /// new row whose name, parent path, size and modification time are all
    /// bit-identical to the previous record. Anything else stays absent and
    /// gets re-hashed. Returns the number of fingerprints reused.
    pub fn carry_forward_fingerprints(&self) -> Result<usize, Error> {
        let reused = self.connection().execute(
            "UPDATE file SET fingerprint = (
                 SELECT old.fingerprint FROM file_old AS old
                 WHERE old.name = file.name AND old.parent_path = file.parent_path
                   AND old.size = file.size AND old.modified_ns = file.modified_ns
             )
             WHERE fingerprint IS NULL AND EXISTS (
                 SELECT 1 FROM file_old AS old
                 WHERE old.name = file.name AND old.parent_path = file.parent_path
                   AND old.size = file.size AND old.modified_ns = file.modified_ns
                   AND old.fingerprint IS NOT NULL
             )",
            [],
        )?;
        debug!("carried {} fingerprints forward", reused);
        Ok(reused)
    }

    pub fn pending_fingerprints(&self) -> Result<Vec<FileKey>, Error> {
        let mut stmt = self
            .connection()
            .prepare("SELECT name, parent_path FROM file WHERE fingerprint IS NULL")?;
        let keys = stmt
            .query_map([], |row| {
                Ok(FileKey {
                    name: row.get(0)?,
                    parent_path: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(keys)
    }

    pub fn store_fingerprint(&self, key: &FileKey, fingerprint: &Fingerprint) -> Result<(), Error> {
        let mut stmt = self.connection().prepare_cached(
            "UPDATE file SET fingerprint = ?1 WHERE name = ?2 AND parent_path = ?3",
        )?;
        stmt.execute(params![fingerprint.to_hex(), key.name, key.parent_path])?;
        Ok(())
    }

    pub fn unfingerprinted_count(&self) -> Result<usize, Error> {
        let count: i64 = self.connection().query_row(
            "SELECT COUNT(*) FROM file WHERE fingerprint IS NULL",
            [],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    // ── Folder aggregates ────────────────────────────────────────

    /// Rebuild the folder table from the current file table. `folder_paths`
    /// is every folder seen by the walk, so folders with no direct files get
    /// a record too (the empty-combination aggregate). A folder containing a
    /// file that could not be fingerprinted gets no record for this pass.
    pub fn rebuild_folders(&self, folder_paths: &[String]) -> Result<usize, Error> {
        use std::collections::BTreeMap;

        let mut aggregates: BTreeMap<String, Option<FolderAggregator>> = folder_paths
            .iter()
            .map(|p| (p.clone(), Some(FolderAggregator::new())))
            .collect();

        let mut stmt = self.connection().prepare(
            "SELECT parent_path, name, size, modified_ns, fingerprint FROM file",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, i64>(3)?,
                row.get::<_, Option<String>>(4)?,
            ))
        })?;

        for row in rows {
            let (parent_path, name, size, modified_ns, fingerprint) = row?;
            let slot = aggregates
                .entry(parent_path)
                .or_insert_with(|| Some(FolderAggregator::new()));
            match fingerprint.as_deref().and_then(Fingerprint::from_hex) {
                Some(fp) => {
                    if let Some(agg) = slot.as_mut() {
                        agg.push(&name, size as u64, modified_ns, &fp);
                    }
                }
                // Absent fingerprint: this folder's aggregate is unknowable.
                None => *slot = None,
            }
        }

        self.connection().execute("DELETE FROM folder", [])?;
        let mut insert = self
            .connection()
            .prepare_cached("INSERT INTO folder (path, fingerprint) VALUES (?1, ?2)")?;
        let mut count = 0;
        for (path, slot) in aggregates {
            if let Some(agg) = slot {
                insert.execute(params![path, agg.finish().to_hex()])?;
                count += 1;
            }
        }
        debug!("rebuilt {} folder aggregates", count);
        Ok(count)
    }

    // ── Bulk reads ───────────────────────────────────────────────

    pub fn files(&self) -> Result<Vec<FileRecord>, Error> {
        let mut stmt = self
            .connection()
            .prepare("SELECT name, parent_path, size, modified_ns, fingerprint FROM file")?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, i64>(3)?,
                    row.get::<_, Option<String>>(4)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut records = Vec::with_capacity(rows.len());
        for (name, parent_path, size, modified_ns, fingerprint) in rows {
            let fingerprint = match fingerprint {
                Some(hex) => Some(Fingerprint::from_hex(&hex).ok_or_else(|| {
                    Error::corrupt(self.path(), format!("malformed fingerprint '{hex}'"))
                })?),
                None => None,
            };
            records.push(FileRecord {
                name,
                parent_path,
                size: size as u64,
                modified_ns,
                fingerprint,
            });
        }
        Ok(records)
    }

    pub fn folders(&self) -> Result<Vec<FolderRecord>, Error> {
        let mut stmt = self
            .connection()
            .prepare("SELECT path, fingerprint FROM folder")?;
        let rows = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut records = Vec::with_capacity(rows.len());
        for (path, hex) in rows {
            let fingerprint = Fingerprint::from_hex(&hex).ok_or_else(|| {
                Error::corrupt(self.path(), format!("malformed fingerprint '{hex}'"))
            })?;
            records.push(FolderRecord { path, fingerprint });
        }
        Ok(records)
    }
}
