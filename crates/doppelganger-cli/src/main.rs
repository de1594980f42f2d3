mod commands;
mod logging;
mod progress;

use std::path::{Path, PathBuf};
use std::process;

use clap::{CommandFactory, Parser};
use colored::*;
use commands::{Cli, Commands};
use dotenv::dotenv;
use doppelganger_core::compare::TreeDiff;
use doppelganger_core::store::DEFAULT_CATALOGUE_NAME;
use doppelganger_core::{compare_catalogues, AppConfig, IndexEngine};
use progress::CliReporter;
use tracing::error;

fn main() {
    dotenv().ok();

    let _guard = logging::init_logger();

    let config = match doppelganger_core::config::load_configuration() {
        Ok(config) => config,
        Err(err) => {
            error!("Error loading configuration: {}", err);
            process::exit(1);
        }
    };

    let args = Cli::parse();

    match args.command {
        Some(Commands::Index {
            root,
            full,
            catalogue,
            excludes,
        }) => {
            if let Err(err) = run_index(&config, &root, full, catalogue, excludes) {
                error!("Error: {}", err);
                process::exit(1);
            }
        }
        Some(Commands::Compare {
            root_a,
            root_b,
            catalogue_a,
            catalogue_b,
            json,
        }) => {
            if let Err(err) = run_compare(&config, &root_a, &root_b, catalogue_a, catalogue_b, json)
            {
                error!("Error: {}", err);
                process::exit(1);
            }
        }
        Some(Commands::PrintConfig) => {
            println!("Configuration: {:?}", config);
        }
        None => {
            let _ = Cli::command().print_long_help();
        }
    }
}

fn catalogue_location(config: &AppConfig, root: &Path, explicit: Option<PathBuf>) -> PathBuf {
    if let Some(path) = explicit {
        return path;
    }
    let name = config
        .catalogue_name
        .as_deref()
        .unwrap_or(DEFAULT_CATALOGUE_NAME);
    root.join(name)
}

fn run_index(
    config: &AppConfig,
    root: &Path,
    full: bool,
    catalogue: Option<PathBuf>,
    mut excludes: Vec<String>,
) -> Result<(), doppelganger_core::Error> {
    let location = catalogue_location(config, root, catalogue);

    let mut patterns = config.ignore_patterns.clone();
    patterns.append(&mut excludes);

    let engine = IndexEngine::new(root)
        .with_catalogue_path(&location)
        .with_patterns(patterns);

    let reporter = CliReporter::new();
    let result = if full {
        engine.create(&reporter)?
    } else {
        engine.update(&reporter)?
    };

    println!();
    println!(
        "Walk: {}, Hash: {}",
        format!("{:.2}s", result.walk_duration.as_secs_f64()).green(),
        format!("{:.2}s", result.hash_duration.as_secs_f64()).green(),
    );
    println!(
        "{} files ({} bytes), {} hashed, {} reused, {} folders",
        format!("{}", result.files_seen).cyan(),
        result.bytes_seen,
        format!("{}", result.files_hashed).cyan(),
        format!("{}", result.fingerprints_reused).cyan(),
        format!("{}", result.folders_recorded).cyan(),
    );

    if !result.failed_files.is_empty() {
        println!(
            "{} {} file(s) could not be read and stay unfingerprinted:",
            "warning:".yellow().bold(),
            result.failed_files.len()
        );
        for path in &result.failed_files {
            println!("  {}", path.yellow());
        }
    }

    Ok(())
}

fn run_compare(
    config: &AppConfig,
    root_a: &Path,
    root_b: &Path,
    catalogue_a: Option<PathBuf>,
    catalogue_b: Option<PathBuf>,
    json: bool,
) -> Result<(), doppelganger_core::Error> {
    let location_a = catalogue_location(config, root_a, catalogue_a);
    let location_b = catalogue_location(config, root_b, catalogue_b);

    let diff = compare_catalogues(&location_a, &location_b)?;

    if json {
        match serde_json::to_string_pretty(&diff) {
            Ok(text) => println!("{text}"),
            Err(err) => {
                error!("Error serializing result: {}", err);
                process::exit(1);
            }
        }
        return Ok(());
    }

    print_diff(&diff);
    Ok(())
}

/// Text report. Markers: `===` same content elsewhere, `!!!` same path with
/// different content, `---` present only in A, `+++` present only in B.
fn print_diff(diff: &TreeDiff) {
    if diff.is_empty() {
        println!("{}", "Trees are identical.".green());
        return;
    }

    for pairing in &diff.folder_relocations {
        println!(
            "{} {}/ {} {}/",
            "===".cyan(),
            pairing.a.path,
            "->".cyan(),
            pairing.b.path
        );
    }
    for folder in &diff.folders_missing_in_b {
        println!("{} {}/", "---".red(), folder.path);
    }
    for folder in &diff.folders_missing_in_a {
        println!("{} {}/", "+++".green(), folder.path);
    }
    for pairing in &diff.content_conflicts {
        println!("{} {}", "!!!".red().bold(), pairing.a.path);
    }
    for pairing in &diff.file_relocations {
        println!(
            "{} {} {} {}",
            "===".cyan(),
            pairing.a.path,
            "->".cyan(),
            pairing.b.path
        );
    }
    for file in &diff.files_missing_in_b {
        println!("{} {}", "---".red(), file.path);
    }
    for file in &diff.files_missing_in_a {
        println!("{} {}", "+++".green(), file.path);
    }

    println!();
    println!(
        "{} folder moves, {} conflicts, {} file moves, {} only in A, {} only in B",
        diff.folder_relocations.len(),
        diff.content_conflicts.len(),
        diff.file_relocations.len(),
        diff.folders_missing_in_b.len() + diff.files_missing_in_b.len(),
        diff.folders_missing_in_a.len() + diff.files_missing_in_a.len(),
    );
}
