//! Per-strategy fold over on-chain events, snapshotting eligibility at every
//! sub-epoch tick.

use super::eligibility::{split_liquidity, LiquiditySplit, RewardZoneBoundary};
use super::schedule::SubEpochTick;
use super::CampaignContext;
use crate::domain::{
    sort_events_deterministic, Address, Decimal, EventKind, Order, StrategyEvent, StrategyId,
    TimeSec,
};
use crate::math::{decode_order, effective_marginal_price};
use tracing::{debug, warn};

/// Where the latest applied event came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provenance {
    pub last_event_timestamp: TimeSec,
    pub last_processed_block: i64,
    pub owner: Address,
}

impl Provenance {
    fn from_event(event: &StrategyEvent) -> Self {
        Self {
            last_event_timestamp: event.timestamp,
            last_processed_block: event.block_number,
            owner: event.owner.clone(),
        }
    }
}

/// Both decoded orders of a live strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedStrategy {
    pub order0: Order,
    pub order1: Order,
    pub provenance: Provenance,
}

/// Lifecycle of one strategy as seen by the accumulator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StrategyState {
    /// No event applied yet.
    Uninitialized,
    Tracking(TrackedStrategy),
    /// The latest event could not be decoded; ticks are skipped until the
    /// next valid event.
    Malformed {
        provenance: Provenance,
        reason: String,
    },
    Deleted,
}

/// Eligibility snapshot of one order side at a tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SideTick {
    pub order: Order,
    pub split: LiquiditySplit,
    pub boundary: Option<RewardZoneBoundary>,
    pub usd_rate: Option<Decimal>,
    pub marginal_price: Decimal,
}

/// A strategy's state at one tick, before rewards are assigned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrategyTick {
    pub strategy_id: StrategyId,
    pub tick_number: i64,
    /// Seconds of the tick during which the strategy existed.
    pub covered_seconds: i64,
    pub covered_fraction: Decimal,
    pub target_price: Option<Decimal>,
    pub side0: SideTick,
    pub side1: SideTick,
    pub provenance: Provenance,
}

/// Walks one strategy's events forward through the campaign ticks.
///
/// Events are applied strictly in on-chain order, and only once their
/// timestamp is at or before the tick instant.
pub struct StrategyAccumulator<'a> {
    ctx: &'a CampaignContext,
    strategy_id: StrategyId,
    events: Vec<StrategyEvent>,
    next_event: usize,
    state: StrategyState,
    first_seen: Option<TimeSec>,
    /// Orders held right before a deletion that the next snapshot has not
    /// yet accounted for, with the deletion time.
    retired: Option<(TrackedStrategy, TimeSec)>,
}

impl<'a> StrategyAccumulator<'a> {
    pub fn new(
        ctx: &'a CampaignContext,
        strategy_id: StrategyId,
        mut events: Vec<StrategyEvent>,
    ) -> Self {
        sort_events_deterministic(&mut events);
        Self {
            ctx,
            strategy_id,
            events,
            next_event: 0,
            state: StrategyState::Uninitialized,
            first_seen: None,
            retired: None,
        }
    }

    pub fn state(&self) -> &StrategyState {
        &self.state
    }

    /// Apply every pending event with `timestamp <= instant`.
    pub fn advance_to(&mut self, instant: TimeSec) {
        while let Some(event) = self.events.get(self.next_event) {
            if event.timestamp > instant {
                break;
            }
            let event = event.clone();
            self.apply_event(&event);
            self.next_event += 1;
        }
    }

    fn apply_event(&mut self, event: &StrategyEvent) {
        if self.state == StrategyState::Deleted {
            warn!(
                strategy = %self.strategy_id,
                block = event.block_number,
                "ignoring event for deleted strategy"
            );
            return;
        }
        if self.first_seen.is_none() {
            self.first_seen = Some(event.timestamp);
        }
        let provenance = Provenance::from_event(event);

        if event.kind == EventKind::Deleted {
            debug!(strategy = %self.strategy_id, block = event.block_number, "strategy deleted");
            let previous = std::mem::replace(&mut self.state, StrategyState::Deleted);
            if let StrategyState::Tracking(tracked) = previous {
                self.retired = Some((tracked, event.timestamp));
            }
            return;
        }

        let decoded = decode_order(&event.order0)
            .and_then(|order0| decode_order(&event.order1).map(|order1| (order0, order1)));
        self.state = match decoded {
            Ok((order0, order1)) => StrategyState::Tracking(TrackedStrategy {
                order0,
                order1,
                provenance,
            }),
            Err(err) => {
                warn!(
                    strategy = %self.strategy_id,
                    block = event.block_number,
                    log_index = event.log_index,
                    error = %err,
                    "malformed strategy event"
                );
                StrategyState::Malformed {
                    provenance,
                    reason: err.to_string(),
                }
            }
        };
    }

    /// Snapshot the strategy at `tick`, or None when it held no orders
    /// during the tick.
    ///
    /// A strategy deleted inside the tick is credited up to the deletion.
    pub fn snapshot(&mut self, tick: &SubEpochTick) -> Option<StrategyTick> {
        self.advance_to(tick.end);

        if let Some((tracked, deleted_at)) = self.retired.take() {
            return self.tick_for(&tracked, tick, deleted_at);
        }
        match &self.state {
            StrategyState::Tracking(tracked) => self.tick_for(tracked, tick, tick.end),
            StrategyState::Malformed { reason, .. } => {
                warn!(
                    strategy = %self.strategy_id,
                    sub_epoch = tick.number,
                    reason = %reason,
                    "skipping sub-epoch for malformed strategy"
                );
                None
            }
            StrategyState::Uninitialized | StrategyState::Deleted => None,
        }
    }

    fn tick_for(
        &self,
        tracked: &TrackedStrategy,
        tick: &SubEpochTick,
        live_until: TimeSec,
    ) -> Option<StrategyTick> {
        let first_seen = self.first_seen.unwrap_or(tick.start);
        let covered_from = std::cmp::max(tick.start, first_seen);
        let covered_to = std::cmp::min(tick.end, live_until);
        let covered_seconds = (covered_to.as_secs() - covered_from.as_secs()).max(0);
        if covered_seconds == 0 {
            debug!(
                strategy = %self.strategy_id,
                sub_epoch = tick.number,
                "no coverage in sub-epoch"
            );
            return None;
        }
        let covered_fraction = Decimal::from_i64(covered_seconds)
            .checked_div(&Decimal::from_i64(tick.duration()))
            .unwrap_or_default();

        let (boundary0, boundary1, target_price) = match self.ctx.boundary_at(tick.end) {
            Some(b) => (
                Some(b.order0.clone()),
                Some(b.order1.clone()),
                b.target_price.clone(),
            ),
            None => {
                warn!(
                    strategy = %self.strategy_id,
                    sub_epoch = tick.number,
                    "no reward zone boundary known at tick"
                );
                (None, None, None)
            }
        };

        let token0 = &self.ctx.pair.token0.address;
        let token1 = &self.ctx.pair.token1.address;
        let side0 = self.side_tick(&tracked.order0, boundary0, token0, tick);
        let side1 = self.side_tick(&tracked.order1, boundary1, token1, tick);

        Some(StrategyTick {
            strategy_id: self.strategy_id.clone(),
            tick_number: tick.number,
            covered_seconds,
            covered_fraction,
            target_price,
            side0,
            side1,
            provenance: tracked.provenance.clone(),
        })
    }

    fn side_tick(
        &self,
        order: &Order,
        boundary: Option<RewardZoneBoundary>,
        token: &Address,
        tick: &SubEpochTick,
    ) -> SideTick {
        let split = match &boundary {
            Some(boundary) => split_liquidity(order, boundary),
            None => LiquiditySplit::all_ineligible(Decimal::from_biguint(order.y.value())),
        };
        let usd_rate = match self.ctx.usd_rates.rate_at(token, tick.end) {
            Ok(rate) => Some(rate.clone()),
            Err(err) => {
                warn!(
                    strategy = %self.strategy_id,
                    sub_epoch = tick.number,
                    error = %err,
                    "deferring side reward"
                );
                None
            }
        };
        SideTick {
            order: order.clone(),
            marginal_price: effective_marginal_price(
                order.y.value(),
                &order.a,
                &order.b,
                order.z.value(),
            ),
            split,
            boundary,
            usd_rate,
        }
    }

    /// Snapshot every tick of the campaign schedule.
    pub fn run(mut self) -> Vec<StrategyTick> {
        let ctx = self.ctx;
        ctx.schedule
            .ticks()
            .iter()
            .filter_map(|tick| self.snapshot(tick))
            .collect()
    }
}

/// Fold one strategy's events into its tick snapshots.
pub fn accumulate_strategy(
    ctx: &CampaignContext,
    strategy_id: StrategyId,
    events: Vec<StrategyEvent>,
) -> Vec<StrategyTick> {
    StrategyAccumulator::new(ctx, strategy_id, events).run()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Campaign, CampaignId, EncodedOrder, Pair, PairId, TokenMeta};
    use crate::engine::{Apportionment, BoundaryPoint, ScheduleSettings, UsdRatePoint};
    use chrono::{TimeZone, Utc};
    use num_bigint::BigInt;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    fn ctx() -> CampaignContext {
        let campaign = Campaign {
            id: CampaignId(1),
            pair_id: PairId(1),
            reward_amount: dec("30"),
            reward_token_address: Address::new("0xreward".to_string()),
            reward_token_decimals: 6,
            start_date: Utc.timestamp_opt(0, 0).unwrap(),
            end_date: Utc.timestamp_opt(900, 0).unwrap(),
            opportunity_name: "test".to_string(),
            is_active: true,
            token0_weighting: Decimal::one(),
            token1_weighting: Decimal::one(),
            sub_epoch_seconds: None,
            epoch_seconds: None,
        };
        let pair = Pair {
            id: PairId(1),
            token0: TokenMeta {
                address: Address::new("0xbase".to_string()),
                decimals: 18,
            },
            token1: TokenMeta {
                address: Address::new("0xquote".to_string()),
                decimals: 18,
            },
        };
        let settings = ScheduleSettings {
            sub_epoch_seconds: 300,
            epoch_seconds: 900,
            apportionment: Apportionment::Even,
        };
        let rates = ["0xbase", "0xquote"]
            .iter()
            .map(|token| UsdRatePoint {
                token: Address::new(token.to_string()),
                timestamp: TimeSec::new(0),
                usd_rate: Decimal::one(),
            })
            .collect();
        let boundaries = vec![BoundaryPoint {
            timestamp: TimeSec::new(0),
            target_price: Some(Decimal::one()),
            order0_price: Decimal::one(),
            order1_price: Decimal::one(),
        }];
        CampaignContext::new(campaign, pair, &settings, rates, boundaries).unwrap()
    }

    fn order(y: i64) -> EncodedOrder {
        // flat curve at rate 2^48, i.e. price 1: mantissa 2^47, exponent 1
        EncodedOrder::new(
            BigInt::from(y),
            BigInt::from(1000),
            BigInt::from(0),
            BigInt::from((1u64 << 48) | (1u64 << 47)),
        )
    }

    fn event(kind: EventKind, timestamp: i64, block: i64, log_index: i64, y: i64) -> StrategyEvent {
        StrategyEvent {
            strategy_id: StrategyId::new("7".to_string()),
            pair_id: PairId(1),
            kind,
            timestamp: TimeSec::new(timestamp),
            block_number: block,
            transaction_index: 0,
            log_index,
            order0: order(y),
            order1: order(y),
            owner: Address::new("0xowner".to_string()),
        }
    }

    fn id() -> StrategyId {
        StrategyId::new("7".to_string())
    }

    #[test]
    fn test_events_after_tick_end_are_not_applied() {
        let ctx = ctx();
        let ticks = accumulate_strategy(
            &ctx,
            id(),
            vec![
                event(EventKind::Created, 100, 1, 0, 100),
                event(EventKind::Updated, 301, 2, 0, 500),
            ],
        );
        assert_eq!(ticks.len(), 3);
        assert_eq!(ticks[0].side0.order.y, crate::domain::WeiAmount::from(100u64));
        assert_eq!(ticks[1].side0.order.y, crate::domain::WeiAmount::from(500u64));
        assert_eq!(ticks[1].provenance.last_processed_block, 2);
    }

    #[test]
    fn test_creation_at_tick_end_starts_next_tick() {
        let ctx = ctx();
        let ticks =
            accumulate_strategy(&ctx, id(), vec![event(EventKind::Created, 300, 1, 0, 100)]);
        // no record for the tick it closed, full coverage from the next one
        assert_eq!(ticks.len(), 2);
        assert_eq!(ticks[0].tick_number, 2);
        assert_eq!(ticks[0].covered_seconds, 300);
    }

    #[test]
    fn test_update_at_tick_end_is_applied() {
        let ctx = ctx();
        let ticks = accumulate_strategy(
            &ctx,
            id(),
            vec![
                event(EventKind::Created, 0, 1, 0, 100),
                event(EventKind::Updated, 300, 2, 0, 40),
            ],
        );
        assert_eq!(ticks[0].side0.order.y, crate::domain::WeiAmount::from(40u64));
    }

    #[test]
    fn test_covered_fraction_from_creation_time() {
        let ctx = ctx();
        let ticks =
            accumulate_strategy(&ctx, id(), vec![event(EventKind::Created, 200, 1, 0, 100)]);
        assert_eq!(ticks[0].covered_seconds, 100);
        let third = Decimal::one().checked_div(&Decimal::from_i64(3)).unwrap();
        assert_eq!(ticks[0].covered_fraction, third);
        assert_eq!(ticks[1].covered_fraction, Decimal::one());
    }

    #[test]
    fn test_deletion_credits_time_until_deleted() {
        let ctx = ctx();
        let ticks = accumulate_strategy(
            &ctx,
            id(),
            vec![
                event(EventKind::Created, 10, 1, 0, 100),
                event(EventKind::Deleted, 400, 3, 0, 0),
                event(EventKind::Updated, 500, 4, 0, 50),
            ],
        );
        assert_eq!(ticks.len(), 2);
        assert_eq!(ticks[1].tick_number, 2);
        assert_eq!(ticks[1].covered_seconds, 100);
        // the orders held before the deletion are what earned
        assert_eq!(ticks[1].side0.order.y, crate::domain::WeiAmount::from(100u64));
    }

    #[test]
    fn test_deletion_at_tick_start_adds_nothing() {
        let ctx = ctx();
        let ticks = accumulate_strategy(
            &ctx,
            id(),
            vec![
                event(EventKind::Created, 0, 1, 0, 100),
                event(EventKind::Deleted, 300, 2, 0, 0),
            ],
        );
        assert_eq!(ticks.len(), 1);
        assert_eq!(ticks[0].covered_seconds, 300);
    }

    #[test]
    fn test_created_and_deleted_within_one_tick() {
        let ctx = ctx();
        let ticks = accumulate_strategy(
            &ctx,
            id(),
            vec![
                event(EventKind::Created, 320, 1, 0, 100),
                event(EventKind::Deleted, 380, 2, 0, 0),
            ],
        );
        assert_eq!(ticks.len(), 1);
        assert_eq!(ticks[0].covered_seconds, 60);
        assert_eq!(ticks[0].covered_fraction, dec("0.2"));
    }

    #[test]
    fn test_malformed_event_skips_until_next_valid_one() {
        let ctx = ctx();
        let mut bad = event(EventKind::Updated, 350, 2, 0, 100);
        bad.order0 = EncodedOrder::new(
            BigInt::from(5000),
            BigInt::from(10),
            BigInt::from(0),
            BigInt::from(0),
        );
        let mut acc = StrategyAccumulator::new(
            &ctx,
            id(),
            vec![
                event(EventKind::Created, 10, 1, 0, 100),
                bad,
                event(EventKind::Updated, 700, 3, 0, 40),
            ],
        );
        let ticks: Vec<_> = ctx.schedule.ticks().iter().map(|t| acc.snapshot(t)).collect();
        assert!(ticks[0].is_some());
        assert!(ticks[1].is_none());
        assert!(ticks[2].is_some());
        assert!(matches!(acc.state(), StrategyState::Tracking(_)));
    }

    #[test]
    fn test_same_block_events_follow_log_index() {
        let ctx = ctx();
        let ticks = accumulate_strategy(
            &ctx,
            id(),
            vec![
                event(EventKind::Updated, 10, 1, 5, 300),
                event(EventKind::Created, 10, 1, 2, 100),
            ],
        );
        assert_eq!(ticks[0].side0.order.y, crate::domain::WeiAmount::from(300u64));
    }

    #[test]
    fn test_flat_order_at_boundary_is_eligible() {
        let ctx = ctx();
        let ticks =
            accumulate_strategy(&ctx, id(), vec![event(EventKind::Created, 0, 1, 0, 100)]);
        assert_eq!(ticks[0].side0.split.eligible, dec("100"));
        assert_eq!(ticks[0].side1.split.eligible, dec("100"));
        assert_eq!(ticks[0].target_price, Some(Decimal::one()));
        assert_eq!(ticks[0].side0.usd_rate, Some(Decimal::one()));
    }
}
