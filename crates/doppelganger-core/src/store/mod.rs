pub mod models;
mod queries;
mod sqlite;

pub use models::{FileRecord, FolderRecord, SnapshotRecord};
pub use sqlite::{default_location, Catalogue, DEFAULT_CATALOGUE_NAME};
