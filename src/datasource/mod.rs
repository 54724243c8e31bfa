//! Data source abstraction for campaigns, strategy events and price inputs.

use crate::domain::{Campaign, CampaignId, Pair, PairId, StrategyEvent, TimeSec};
use crate::engine::{BoundaryPoint, UsdRatePoint};
use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

pub mod file;
pub mod mock;

pub use file::FileDataSource;
pub use mock::MockDataSource;

/// Everything the engine consumes, already materialized.
///
/// Implementations return complete histories up to the requested instant;
/// ordering is not guaranteed and is fixed by the engine.
#[async_trait]
pub trait DataSource: Send + Sync + fmt::Debug {
    /// All known campaigns, active or not.
    async fn fetch_campaigns(&self) -> Result<Vec<Campaign>, DataSourceError>;

    async fn fetch_pair(&self, pair_id: PairId) -> Result<Pair, DataSourceError>;

    /// Events for strategies of `pair_id` with `timestamp <= until`.
    async fn fetch_strategy_events(
        &self,
        pair_id: PairId,
        until: TimeSec,
    ) -> Result<Vec<StrategyEvent>, DataSourceError>;

    /// USD quotes for the pair's tokens with `timestamp <= until`.
    async fn fetch_usd_rates(
        &self,
        pair: &Pair,
        until: TimeSec,
    ) -> Result<Vec<UsdRatePoint>, DataSourceError>;

    /// Reward-zone thresholds for a campaign with `timestamp <= until`.
    async fn fetch_boundaries(
        &self,
        campaign_id: CampaignId,
        until: TimeSec,
    ) -> Result<Vec<BoundaryPoint>, DataSourceError>;
}

#[derive(Debug, Clone, Error)]
pub enum DataSourceError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("io error: {0}")]
    Io(String),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("error: {0}")]
    Other(String),
}
