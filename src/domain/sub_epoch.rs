//! Immutable per-strategy reward snapshot for one sub-epoch.

use crate::domain::{Address, CampaignId, CompressedRate, Decimal, StrategyId, TimeSec, WeiAmount};
use serde::{Deserialize, Serialize};

/// Snapshot of one order side within a sub-epoch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SideRecord {
    /// Resting amount `y` at the tick.
    pub liquidity: WeiAmount,
    /// Eligible part of `liquidity`, wei units with fractional digits.
    pub eligible: Decimal,
    pub ineligible: Decimal,
    /// Boundary in the order's scaled-rate domain, if one was known.
    pub reward_zone_boundary: Option<Decimal>,
    pub usd_rate: Option<Decimal>,
    pub weighting: Decimal,
    pub decimals: i64,
    pub z: WeiAmount,
    pub a_compressed: CompressedRate,
    pub b_compressed: CompressedRate,
    /// Effective marginal rate of the order at the tick.
    pub marginal_price: Decimal,
    /// Reward for this side, in reward-token units.
    pub reward: Decimal,
}

/// One strategy's state and reward for one sub-epoch of one campaign.
///
/// Unique by `(campaign_id, strategy_id, sub_epoch_number)` and by
/// `(campaign_id, strategy_id, sub_epoch_timestamp)`. Never mutated once
/// produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubEpochRecord {
    pub campaign_id: CampaignId,
    pub strategy_id: StrategyId,
    pub epoch_number: i64,
    pub sub_epoch_number: i64,
    pub epoch_start: TimeSec,
    /// End of the sub-epoch interval; the instant the snapshot is taken.
    pub sub_epoch_timestamp: TimeSec,
    pub target_price: Option<Decimal>,
    /// Share of the sub-epoch during which the strategy existed.
    pub covered_fraction: Decimal,
    pub token0: SideRecord,
    pub token1: SideRecord,
    pub total_reward: Decimal,
    pub last_event_timestamp: TimeSec,
    pub last_processed_block: i64,
    pub owner_address: Address,
}

impl SubEpochRecord {
    /// Canonical JSON used for storage and digests.
    pub fn canonical_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// SHA-256 of the canonical JSON, hex encoded.
    pub fn digest(&self) -> Result<String, serde_json::Error> {
        use sha2::{Digest, Sha256};

        let json = self.canonical_json()?;
        let hash = Sha256::digest(json.as_bytes());
        Ok(hex::encode(hash))
    }
}

/// Digest over an ordered record sequence, for replay comparisons.
pub fn sequence_digest(records: &[SubEpochRecord]) -> Result<String, serde_json::Error> {
    use sha2::{Digest, Sha256};

    let mut hasher = Sha256::new();
    for record in records {
        hasher.update(record.canonical_json()?.as_bytes());
        hasher.update(b"\n");
    }
    Ok(hex::encode(hasher.finalize()))
}
