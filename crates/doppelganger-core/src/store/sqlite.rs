use std::path::{Path, PathBuf};

use rusqlite::{Connection, OpenFlags};
use tracing::debug;

use crate::error::Error;

/// Default catalogue location: a hidden file inside the tree it describes.
pub const DEFAULT_CATALOGUE_NAME: &str = ".doppelganger.db";

pub(crate) const SCHEMA_VERSION: i64 = 1;

/// The `file` table is staged aside and recreated during incremental updates,
/// so its DDL lives here rather than in schema.sql.
pub(crate) const FILE_TABLE_SQL: &str = "
    CREATE TABLE IF NOT EXISTS file (
        name        TEXT    NOT NULL,
        parent_path TEXT    NOT NULL,
        size        INTEGER NOT NULL,
        modified_ns INTEGER NOT NULL,
        fingerprint TEXT,
        PRIMARY KEY (name, parent_path)
    );
    CREATE INDEX IF NOT EXISTS idx_file_fingerprint ON file (fingerprint);
";

pub fn default_location(root: &Path) -> PathBuf {
    root.join(DEFAULT_CATALOGUE_NAME)
}

/// One tree's persistent catalogue: a file table, a folder table, and
/// snapshot bookkeeping, all in a single SQLite database.
pub struct Catalogue {
    conn: Connection,
    path: PathBuf,
}

impl Catalogue {
    /// Open (creating if missing) the catalogue for writing.
    pub fn open(path: &Path) -> Result<Self, Error> {
        let conn = Connection::open(path)?;
        let catalogue = Catalogue {
            conn,
            path: path.to_path_buf(),
        };
        catalogue.configure_pragmas()?;
        catalogue.migrate_schema()?;
        Ok(catalogue)
    }

    /// Open an existing catalogue read-only, verifying its layout. Used by
    /// the comparator, which must never mutate either side.
    pub fn open_read_only(path: &Path) -> Result<Self, Error> {
        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
        let catalogue = Catalogue {
            conn,
            path: path.to_path_buf(),
        };
        catalogue.verify_layout()?;
        Ok(catalogue)
    }

    pub fn open_in_memory() -> Result<Self, Error> {
        let conn = Connection::open_in_memory()?;
        let catalogue = Catalogue {
            conn,
            path: PathBuf::from(":memory:"),
        };
        catalogue.configure_pragmas()?;
        catalogue.migrate_schema()?;
        Ok(catalogue)
    }

    fn configure_pragmas(&self) -> Result<(), Error> {
        self.conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA busy_timeout = 5000;",
        )?;
        Ok(())
    }

    /// Check the schema version and migrate if needed. Catalogue content is
    /// recomputable from the tree, so an outdated layout is dropped and
    /// rebuilt rather than upgraded in place.
    fn migrate_schema(&self) -> Result<(), Error> {
        let version = self.user_version()?;

        if version > SCHEMA_VERSION {
            return Err(Error::corrupt(
                &self.path,
                format!("schema version {version} is newer than supported {SCHEMA_VERSION}"),
            ));
        }

        if version != 0 && version < SCHEMA_VERSION {
            debug!(
                "catalogue schema version {} < {}, dropping and recreating",
                version, SCHEMA_VERSION
            );
            self.conn.execute_batch(
                "DROP TABLE IF EXISTS snapshot;
                 DROP TABLE IF EXISTS folder;
                 DROP TABLE IF EXISTS file;",
            )?;
        }

        self.conn.execute_batch(include_str!("schema.sql"))?;
        self.conn.execute_batch(FILE_TABLE_SQL)?;
        Ok(())
    }

    fn verify_layout(&self) -> Result<(), Error> {
        let version = self.user_version()?;
        if version != SCHEMA_VERSION {
            return Err(Error::corrupt(
                &self.path,
                format!("schema version {version}, expected {SCHEMA_VERSION}"),
            ));
        }
        for table in ["file", "folder"] {
            let present: i64 = self.conn.query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
                [table],
                |row| row.get(0),
            )?;
            if present == 0 {
                return Err(Error::corrupt(
                    &self.path,
                    format!("missing table '{table}'"),
                ));
            }
        }
        Ok(())
    }

    fn user_version(&self) -> Result<i64, Error> {
        self.conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))
            .map_err(|e| Error::corrupt(&self.path, e.to_string()))
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
