//! Mock data source for testing without touching the filesystem.

use super::{DataSource, DataSourceError};
use crate::domain::{Campaign, CampaignId, Pair, PairId, StrategyEvent, TimeSec};
use crate::engine::{BoundaryPoint, UsdRatePoint};
use async_trait::async_trait;
use std::collections::BTreeMap;

/// Mock data source that returns predefined test data.
#[derive(Debug, Clone, Default)]
pub struct MockDataSource {
    campaigns: Vec<Campaign>,
    pairs: Vec<Pair>,
    events: Vec<StrategyEvent>,
    usd_rates: Vec<UsdRatePoint>,
    boundaries: BTreeMap<CampaignId, Vec<BoundaryPoint>>,
}

impl MockDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_campaign(mut self, campaign: Campaign) -> Self {
        self.campaigns.push(campaign);
        self
    }

    pub fn with_pair(mut self, pair: Pair) -> Self {
        self.pairs.push(pair);
        self
    }

    pub fn with_event(mut self, event: StrategyEvent) -> Self {
        self.events.push(event);
        self
    }

    pub fn with_events(mut self, events: Vec<StrategyEvent>) -> Self {
        self.events.extend(events);
        self
    }

    pub fn with_usd_rate(mut self, point: UsdRatePoint) -> Self {
        self.usd_rates.push(point);
        self
    }

    pub fn with_boundary(mut self, campaign_id: CampaignId, point: BoundaryPoint) -> Self {
        self.boundaries.entry(campaign_id).or_default().push(point);
        self
    }
}

#[async_trait]
impl DataSource for MockDataSource {
    async fn fetch_campaigns(&self) -> Result<Vec<Campaign>, DataSourceError> {
        Ok(self.campaigns.clone())
    }

    async fn fetch_pair(&self, pair_id: PairId) -> Result<Pair, DataSourceError> {
        self.pairs
            .iter()
            .find(|p| p.id == pair_id)
            .cloned()
            .ok_or_else(|| DataSourceError::NotFound(format!("pair {}", pair_id)))
    }

    async fn fetch_strategy_events(
        &self,
        pair_id: PairId,
        until: TimeSec,
    ) -> Result<Vec<StrategyEvent>, DataSourceError> {
        Ok(self
            .events
            .iter()
            .filter(|e| e.pair_id == pair_id && e.timestamp <= until)
            .cloned()
            .collect())
    }

    async fn fetch_usd_rates(
        &self,
        pair: &Pair,
        until: TimeSec,
    ) -> Result<Vec<UsdRatePoint>, DataSourceError> {
        let tokens = [
            pair.token0.address.as_str().to_lowercase(),
            pair.token1.address.as_str().to_lowercase(),
        ];
        Ok(self
            .usd_rates
            .iter()
            .filter(|r| r.timestamp <= until && tokens.contains(&r.token.as_str().to_lowercase()))
            .cloned()
            .collect())
    }

    async fn fetch_boundaries(
        &self,
        campaign_id: CampaignId,
        until: TimeSec,
    ) -> Result<Vec<BoundaryPoint>, DataSourceError> {
        Ok(self
            .boundaries
            .get(&campaign_id)
            .map(|points| points.iter().filter(|b| b.timestamp <= until).cloned().collect())
            .unwrap_or_default())
    }
}
