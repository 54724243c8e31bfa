//! Domain types and determinism layer for strategy reward accounting.
//!
//! This module provides:
//! - Exact numeric handling via the bigdecimal-backed Decimal wrapper
//! - Scale-tagged integers: CompressedRate, WeiAmount
//! - Orders, strategy events and their on-chain ordering key
//! - Campaign descriptors and the immutable SubEpochRecord

pub mod campaign;
pub mod decimal;
pub mod event;
pub mod order;
pub mod ordering;
pub mod primitives;
pub mod scale;
pub mod serde_str;
pub mod sub_epoch;

pub use campaign::{Campaign, Pair, TokenMeta};
pub use decimal::Decimal;
pub use event::{EventKind, StrategyEvent};
pub use order::{EncodedOrder, Order};
pub use ordering::{sort_events_deterministic, EventOrderingKey};
pub use primitives::{Address, CampaignId, OrderSide, PairId, StrategyId, TimeSec};
pub use scale::{CompressedRate, WeiAmount};
pub use sub_epoch::{sequence_digest, SideRecord, SubEpochRecord};
