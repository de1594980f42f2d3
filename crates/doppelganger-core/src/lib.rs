pub mod aggregate;
pub mod compare;
pub mod config;
pub mod engine;
pub mod error;
pub mod exclude;
pub mod fingerprint;
pub mod hasher;
pub mod progress;
pub mod store;
pub mod walker;

pub use compare::{compare_catalogues, TreeDiff};
pub use config::AppConfig;
pub use engine::{IndexEngine, IndexResult};
pub use error::Error;
pub use fingerprint::Fingerprint;
pub use progress::{ProgressReporter, SilentReporter};
