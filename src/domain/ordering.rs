//! Stable on-chain event ordering for deterministic processing.

use crate::domain::StrategyEvent;

/// Stable ordering key for strategy events.
///
/// Ordering: block_number -> transaction_index -> log_index
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EventOrderingKey {
    /// Block number (primary sort).
    pub block_number: i64,
    /// Position of the transaction inside the block.
    pub transaction_index: i64,
    /// Position of the log inside the transaction receipt.
    pub log_index: i64,
}

impl EventOrderingKey {
    /// Create an ordering key from an event.
    pub fn from_event(event: &StrategyEvent) -> Self {
        EventOrderingKey {
            block_number: event.block_number,
            transaction_index: event.transaction_index,
            log_index: event.log_index,
        }
    }
}

/// Sort events deterministically in on-chain order.
pub fn sort_events_deterministic(events: &mut [StrategyEvent]) {
    events.sort_by_key(EventOrderingKey::from_event);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Address, EncodedOrder, EventKind, PairId, StrategyId, TimeSec};

    fn make_event(block: i64, tx: i64, log: i64) -> StrategyEvent {
        StrategyEvent {
            strategy_id: StrategyId::new("1".to_string()),
            pair_id: PairId(1),
            kind: EventKind::Updated,
            timestamp: TimeSec::new(block * 12),
            block_number: block,
            transaction_index: tx,
            log_index: log,
            order0: EncodedOrder::empty(),
            order1: EncodedOrder::empty(),
            owner: Address::new("0xowner".to_string()),
        }
    }

    #[test]
    fn test_event_ordering_by_block() {
        let a = EventOrderingKey::from_event(&make_event(10, 5, 5));
        let b = EventOrderingKey::from_event(&make_event(11, 0, 0));
        assert!(a < b);
        assert!(b > a);
    }

    #[test]
    fn test_event_ordering_same_block_by_tx_then_log() {
        let a = EventOrderingKey::from_event(&make_event(10, 1, 9));
        let b = EventOrderingKey::from_event(&make_event(10, 2, 0));
        let c = EventOrderingKey::from_event(&make_event(10, 2, 1));
        assert!(a < b);
        assert!(b < c);
    }

    #[test]
    fn test_sort_events_deterministic() {
        let mut events = vec![make_event(12, 0, 0), make_event(10, 3, 1), make_event(10, 3, 0)];
        sort_events_deterministic(&mut events);
        let keys: Vec<_> = events
            .iter()
            .map(|e| (e.block_number, e.transaction_index, e.log_index))
            .collect();
        assert_eq!(keys, vec![(10, 3, 0), (10, 3, 1), (12, 0, 0)]);
    }
}
