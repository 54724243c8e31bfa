//! Reads campaign inputs from a directory of exported files.
//!
//! Layout:
//! - `campaigns.json`: `{ "campaigns": [...], "pairs": [...] }`
//! - `events.csv`: one row per strategy event, both orders inlined
//! - `usd_rates.csv`: `token,timestamp,usd_rate`
//! - `boundaries.csv`: `campaign_id,timestamp,target_price,order0_price,order1_price`
//!
//! The two price files are optional; a missing file reads as no data.

use super::{DataSource, DataSourceError};
use crate::domain::{
    Address, Campaign, CampaignId, Decimal, EncodedOrder, EventKind, Pair, PairId,
    StrategyEvent, StrategyId, TimeSec,
};
use crate::engine::{BoundaryPoint, UsdRatePoint};
use async_trait::async_trait;
use num_bigint::BigInt;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const CAMPAIGNS_FILE: &str = "campaigns.json";
pub const EVENTS_FILE: &str = "events.csv";
pub const USD_RATES_FILE: &str = "usd_rates.csv";
pub const BOUNDARIES_FILE: &str = "boundaries.csv";

#[derive(Debug, Clone)]
pub struct FileDataSource {
    dir: PathBuf,
    default_reward_decimals: u32,
}

#[derive(Debug, Deserialize)]
struct CampaignsFile {
    #[serde(default)]
    campaigns: Vec<serde_json::Value>,
    #[serde(default)]
    pairs: Vec<Pair>,
}

impl FileDataSource {
    /// `default_reward_decimals` applies to campaigns that do not state
    /// their reward token decimals.
    pub fn new(dir: impl Into<PathBuf>, default_reward_decimals: u32) -> Self {
        Self {
            dir: dir.into(),
            default_reward_decimals,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    async fn read(&self, name: &str) -> Result<Vec<u8>, DataSourceError> {
        let path = self.dir.join(name);
        tokio::fs::read(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                DataSourceError::NotFound(path.display().to_string())
            } else {
                DataSourceError::Io(format!("{}: {}", path.display(), e))
            }
        })
    }

    async fn read_optional(&self, name: &str) -> Result<Vec<u8>, DataSourceError> {
        match self.read(name).await {
            Err(DataSourceError::NotFound(path)) => {
                warn!(path = %path, "input file missing, treating as empty");
                Ok(Vec::new())
            }
            other => other,
        }
    }

    async fn load_campaigns_file(&self) -> Result<CampaignsFile, DataSourceError> {
        let bytes = self.read(CAMPAIGNS_FILE).await?;
        serde_json::from_slice(&bytes)
            .map_err(|e| DataSourceError::Parse(format!("{}: {}", CAMPAIGNS_FILE, e)))
    }

    pub fn parse_campaigns(
        values: Vec<serde_json::Value>,
        default_reward_decimals: u32,
    ) -> Result<Vec<Campaign>, DataSourceError> {
        values
            .into_iter()
            .map(|mut value| {
                if let Some(obj) = value.as_object_mut() {
                    obj.entry("rewardTokenDecimals")
                        .or_insert_with(|| serde_json::Value::from(default_reward_decimals));
                }
                serde_json::from_value::<Campaign>(value)
                    .map_err(|e| DataSourceError::Parse(format!("campaign: {}", e)))
            })
            .collect()
    }

    pub fn parse_events_csv(csv_bytes: &[u8]) -> Result<Vec<StrategyEvent>, DataSourceError> {
        #[derive(Debug, Deserialize)]
        struct Row {
            strategy_id: String,
            pair_id: i64,
            kind: String,
            timestamp: i64,
            block_number: i64,
            transaction_index: i64,
            log_index: i64,
            owner: String,
            order0_y: String,
            order0_z: String,
            order0_a: String,
            order0_b: String,
            order1_y: String,
            order1_z: String,
            order1_a: String,
            order1_b: String,
        }

        fn int(field: &str, value: &str) -> Result<BigInt, DataSourceError> {
            value.trim().parse::<BigInt>().map_err(|e| {
                DataSourceError::Parse(format!("invalid {}: {} ({})", field, value, e))
            })
        }

        fn order(y: &str, z: &str, a: &str, b: &str) -> Result<EncodedOrder, DataSourceError> {
            Ok(EncodedOrder::new(
                int("y", y)?,
                int("z", z)?,
                int("a_compressed", a)?,
                int("b_compressed", b)?,
            ))
        }

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(csv_bytes);

        let mut events = Vec::new();
        for record in reader.deserialize::<Row>() {
            let row = record.map_err(|e| DataSourceError::Parse(e.to_string()))?;
            let kind = EventKind::parse(&row.kind).ok_or_else(|| {
                DataSourceError::Parse(format!("invalid event kind: {}", row.kind))
            })?;

            events.push(StrategyEvent {
                strategy_id: StrategyId::new(row.strategy_id),
                pair_id: PairId(row.pair_id),
                kind,
                timestamp: TimeSec::new(row.timestamp),
                block_number: row.block_number,
                transaction_index: row.transaction_index,
                log_index: row.log_index,
                order0: order(&row.order0_y, &row.order0_z, &row.order0_a, &row.order0_b)?,
                order1: order(&row.order1_y, &row.order1_z, &row.order1_a, &row.order1_b)?,
                owner: Address::new(row.owner),
            });
        }

        Ok(events)
    }

    pub fn parse_usd_rates_csv(csv_bytes: &[u8]) -> Result<Vec<UsdRatePoint>, DataSourceError> {
        #[derive(Debug, Deserialize)]
        struct Row {
            token: String,
            timestamp: i64,
            usd_rate: String,
        }

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(csv_bytes);

        let mut points = Vec::new();
        for record in reader.deserialize::<Row>() {
            let row = record.map_err(|e| DataSourceError::Parse(e.to_string()))?;
            let usd_rate = Decimal::from_str_canonical(&row.usd_rate)
                .map_err(|e| DataSourceError::Parse(format!("invalid usd_rate: {}", e)))?;
            points.push(UsdRatePoint {
                token: Address::new(row.token),
                timestamp: TimeSec::new(row.timestamp),
                usd_rate,
            });
        }
        Ok(points)
    }

    pub fn parse_boundaries_csv(
        csv_bytes: &[u8],
    ) -> Result<Vec<(CampaignId, BoundaryPoint)>, DataSourceError> {
        #[derive(Debug, Deserialize)]
        struct Row {
            campaign_id: i64,
            timestamp: i64,
            target_price: Option<String>,
            order0_price: String,
            order1_price: String,
        }

        fn price(field: &str, value: &str) -> Result<Decimal, DataSourceError> {
            Decimal::from_str_canonical(value)
                .map_err(|e| DataSourceError::Parse(format!("invalid {}: {}", field, e)))
        }

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(csv_bytes);

        let mut points = Vec::new();
        for record in reader.deserialize::<Row>() {
            let row = record.map_err(|e| DataSourceError::Parse(e.to_string()))?;
            let target_price = match row.target_price.as_deref() {
                None | Some("") => None,
                Some(value) => Some(price("target_price", value)?),
            };
            points.push((
                CampaignId(row.campaign_id),
                BoundaryPoint {
                    timestamp: TimeSec::new(row.timestamp),
                    target_price,
                    order0_price: price("order0_price", &row.order0_price)?,
                    order1_price: price("order1_price", &row.order1_price)?,
                },
            ));
        }
        Ok(points)
    }
}

#[async_trait]
impl DataSource for FileDataSource {
    async fn fetch_campaigns(&self) -> Result<Vec<Campaign>, DataSourceError> {
        let file = self.load_campaigns_file().await?;
        let campaigns = Self::parse_campaigns(file.campaigns, self.default_reward_decimals)?;
        debug!(count = campaigns.len(), "loaded campaigns");
        Ok(campaigns)
    }

    async fn fetch_pair(&self, pair_id: PairId) -> Result<Pair, DataSourceError> {
        let file = self.load_campaigns_file().await?;
        file.pairs
            .into_iter()
            .find(|p| p.id == pair_id)
            .ok_or_else(|| DataSourceError::NotFound(format!("pair {}", pair_id)))
    }

    async fn fetch_strategy_events(
        &self,
        pair_id: PairId,
        until: TimeSec,
    ) -> Result<Vec<StrategyEvent>, DataSourceError> {
        let bytes = self.read(EVENTS_FILE).await?;
        let events: Vec<StrategyEvent> = Self::parse_events_csv(&bytes)?
            .into_iter()
            .filter(|e| e.pair_id == pair_id && e.timestamp <= until)
            .collect();
        debug!(pair_id = %pair_id, count = events.len(), "loaded strategy events");
        Ok(events)
    }

    async fn fetch_usd_rates(
        &self,
        pair: &Pair,
        until: TimeSec,
    ) -> Result<Vec<UsdRatePoint>, DataSourceError> {
        let bytes = self.read_optional(USD_RATES_FILE).await?;
        let tokens = [
            pair.token0.address.as_str().to_lowercase(),
            pair.token1.address.as_str().to_lowercase(),
        ];
        Ok(Self::parse_usd_rates_csv(&bytes)?
            .into_iter()
            .filter(|r| r.timestamp <= until && tokens.contains(&r.token.as_str().to_lowercase()))
            .collect())
    }

    async fn fetch_boundaries(
        &self,
        campaign_id: CampaignId,
        until: TimeSec,
    ) -> Result<Vec<BoundaryPoint>, DataSourceError> {
        let bytes = self.read_optional(BOUNDARIES_FILE).await?;
        Ok(Self::parse_boundaries_csv(&bytes)?
            .into_iter()
            .filter(|(id, point)| *id == campaign_id && point.timestamp <= until)
            .map(|(_, point)| point)
            .collect())
    }
}
