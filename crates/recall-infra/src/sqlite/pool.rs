//! Database pool with split reader/writer connections in WAL mode.
//!
//! SQLite allows only one writer at a time. `DatabasePool` pairs a
//! multi-connection reader pool for similarity scans and listings with a
//! single-connection writer pool that serializes turn appends.
//!
//! Every connection has the sqlite-vec extension loaded, which provides
//! the `vec_*` SQL functions used by similarity search.

use std::path::Path;
use std::str::FromStr;
use std::sync::Once;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};

static SQLITE_VEC_INIT: Once = Once::new();

/// Register sqlite-vec as an auto extension (once per process).
///
/// Must run before the first connection is opened.
#[allow(clippy::missing_transmute_annotations)]
pub(crate) fn ensure_sqlite_vec_registered() {
    SQLITE_VEC_INIT.call_once(|| {
        // SAFETY: sqlite3_vec_init is the extension entry point that
        // sqlite3_auto_extension expects; the transmute only changes the
        // declared fn-pointer type. The symbol is statically linked.
        let rc = unsafe {
            libsqlite3_sys::sqlite3_auto_extension(Some(std::mem::transmute(
                sqlite_vec::sqlite3_vec_init as *const (),
            )))
        };
        if rc == libsqlite3_sys::SQLITE_OK {
            tracing::debug!("sqlite-vec extension registered");
        } else {
            tracing::error!(code = rc, "Failed to register sqlite-vec extension");
        }
    });
}

/// Split read/write pool for SQLite with WAL mode.
///
/// - `reader`: Multi-connection pool (up to 8) for concurrent SELECT queries.
/// - `writer`: Single-connection pool for serialized INSERTs.
#[derive(Clone)]
pub struct DatabasePool {
    pub reader: SqlitePool,
    pub writer: SqlitePool,
}

impl DatabasePool {
    /// Open (or create) the database and run pending migrations.
    ///
    /// Both pools use WAL journal mode and a 5-second busy timeout.
    pub async fn new(database_url: &str) -> Result<Self, sqlx::Error> {
        ensure_sqlite_vec_registered();

        let base_opts = SqliteConnectOptions::from_str(database_url)?
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5))
            .create_if_missing(true);

        let read_opts = base_opts.clone().read_only(true);
        let write_opts = base_opts;

        let writer = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(write_opts)
            .await?;

        // Migrate before the reader opens so it never sees a partial schema
        sqlx::migrate!("../../migrations").run(&writer).await?;

        let reader = SqlitePoolOptions::new()
            .max_connections(8)
            .connect_with(read_opts)
            .await?;

        Ok(Self { reader, writer })
    }
}

/// SQLite URL for `file_name` inside `data_dir`.
pub fn database_url(data_dir: &Path, file_name: &str) -> String {
    format!("sqlite://{}", data_dir.join(file_name).display())
}
