//! Repository layer for database operations.
//!
//! Methods are organized across submodules:
//! - `sub_epochs.rs` - append-only reward records
//! - `runs.rs` - per-run bookkeeping

mod runs;
mod sub_epochs;

use sqlx::sqlite::SqlitePool;
use thiserror::Error;

pub use runs::CampaignRun;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("record encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
    #[error("corrupt row: {0}")]
    Corrupt(String),
}

/// Result of an append-only batch insert.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InsertOutcome {
    /// Rows written by this call.
    pub inserted: usize,
    /// Rows already stored with an identical digest.
    pub unchanged: usize,
    /// Rows already stored with a different digest; the stored row wins.
    pub diverged: usize,
}

/// Repository for database operations.
#[derive(Debug, Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Repository { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
