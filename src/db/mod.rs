//! SQLite persistence for sub-epoch reward records.
//!
//! - Store initialization, schema and pragmas
//! - Repository layer over the append-only `sub_epochs` table

pub mod migrations;
pub mod repo;

pub use migrations::init_db;
pub use repo::{CampaignRun, InsertOutcome, RepoError, Repository};
