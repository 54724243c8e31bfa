pub mod config;
pub mod datasource;
pub mod db;
pub mod domain;
pub mod engine;
pub mod error;
pub mod math;
pub mod orchestration;

pub use config::Config;
pub use datasource::{DataSource, DataSourceError, FileDataSource, MockDataSource};
pub use db::{init_db, Repository};
pub use domain::{
    Address, Campaign, CampaignId, Decimal, Order, Pair, PairId, StrategyEvent, StrategyId,
    SubEpochRecord, TimeSec,
};
pub use engine::{CampaignContext, EngineError};
pub use error::AppError;
pub use orchestration::Orchestrator;
