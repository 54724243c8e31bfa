//! On-chain strategy events as supplied by the indexer.

use crate::domain::{Address, EncodedOrder, PairId, StrategyId, TimeSec};
use serde::{Deserialize, Serialize};

/// Kind of strategy lifecycle event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Created,
    Updated,
    Deleted,
}

impl EventKind {
    /// Parse the event kind as written by the indexer.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "created" | "strategycreated" => Some(EventKind::Created),
            "updated" | "strategyupdated" => Some(EventKind::Updated),
            "deleted" | "strategydeleted" => Some(EventKind::Deleted),
            _ => None,
        }
    }
}

/// One strategy event with both orders as they stood after the event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyEvent {
    pub strategy_id: StrategyId,
    pub pair_id: PairId,
    pub kind: EventKind,
    pub timestamp: TimeSec,
    pub block_number: i64,
    pub transaction_index: i64,
    pub log_index: i64,
    /// Sell side, holds token0.
    pub order0: EncodedOrder,
    /// Buy side, holds token1.
    pub order1: EncodedOrder,
    pub owner: Address,
}
