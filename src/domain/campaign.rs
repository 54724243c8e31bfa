//! Reward campaign descriptor and token metadata.

use crate::domain::{Address, CampaignId, Decimal, PairId, TimeSec};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

fn default_weighting() -> Decimal {
    Decimal::one()
}

fn default_reward_decimals() -> u32 {
    18
}

fn default_active() -> bool {
    true
}

/// A reward pool for one pair over a fixed window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Campaign {
    pub id: CampaignId,
    pub pair_id: PairId,
    /// Total reward, in reward-token units.
    pub reward_amount: Decimal,
    pub reward_token_address: Address,
    /// Fractional digits of the reward token; rewards are allocated in these units.
    #[serde(default = "default_reward_decimals")]
    pub reward_token_decimals: u32,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub opportunity_name: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default = "default_weighting")]
    pub token0_weighting: Decimal,
    #[serde(default = "default_weighting")]
    pub token1_weighting: Decimal,
    /// Overrides the configured sub-epoch width.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_epoch_seconds: Option<i64>,
    /// Overrides the configured epoch width.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub epoch_seconds: Option<i64>,
}

impl Campaign {
    pub fn start_time(&self) -> TimeSec {
        TimeSec::new(self.start_date.timestamp())
    }

    pub fn end_time(&self) -> TimeSec {
        TimeSec::new(self.end_date.timestamp())
    }
}

/// Token address and decimal count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenMeta {
    pub address: Address,
    /// Kept signed because it arrives from external sources unvalidated.
    pub decimals: i64,
}

/// A trading pair: token0 is the base, token1 the quote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pair {
    pub id: PairId,
    pub token0: TokenMeta,
    pub token1: TokenMeta,
}
