use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "doppelganger")]
#[command(about = "Content-addressed tree catalogues and cross-tree comparison", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Build or incrementally update the catalogue for a tree
    Index {
        /// Root directory of the tree
        root: PathBuf,

        /// Rebuild from scratch instead of reusing cached fingerprints
        #[arg(long)]
        full: bool,

        /// Catalogue location (default: a hidden file inside the root)
        #[arg(long)]
        catalogue: Option<PathBuf>,

        /// Additional exclusion globs, on top of the tree's pattern file
        #[arg(long = "exclude", value_name = "GLOB")]
        excludes: Vec<String>,
    },
    /// Compare two trees' catalogues and print the classified differences
    Compare {
        /// Root directory of tree A
        root_a: PathBuf,

        /// Root directory of tree B
        root_b: PathBuf,

        /// Catalogue location for tree A
        #[arg(long)]
        catalogue_a: Option<PathBuf>,

        /// Catalogue location for tree B
        #[arg(long)]
        catalogue_b: Option<PathBuf>,

        /// Emit the result as JSON instead of the text report
        #[arg(long)]
        json: bool,
    },
    /// Print configuration values
    PrintConfig,
}
