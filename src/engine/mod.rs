//! Pure computation engine for per-sub-epoch strategy rewards.
//!
//! Nothing here touches the network or the database. Given a campaign, its
//! pair, the strategy events and the external price series, the engine
//! produces the same `SubEpochRecord`s on every run.

use crate::domain::{
    Address, Campaign, Decimal, OrderSide, Pair, PairId, StrategyEvent, StrategyId,
    SubEpochRecord, TimeSec,
};
use crate::math::{wei_scale, MathError};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, warn};

pub mod accumulator;
pub mod distributor;
pub mod eligibility;
pub mod schedule;
pub mod series;

pub use accumulator::{
    accumulate_strategy, Provenance, SideTick, StrategyAccumulator, StrategyState, StrategyTick,
};
pub use distributor::{largest_remainder, RewardDistributor, SideWeighting};
pub use eligibility::{split_liquidity, LiquiditySplit, RewardZoneBoundary, LIQUIDITY_SCALE};
pub use schedule::{Apportionment, ScheduleSettings, SubEpochSchedule, SubEpochTick};
pub use series::{BoundaryPoint, TimeSeries, UsdRateBook, UsdRatePoint};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Math(#[from] MathError),

    #[error("no usd rate for {token} at or before {at}")]
    MissingUsdRate { token: Address, at: TimeSec },

    #[error("invalid schedule: {0}")]
    InvalidSchedule(String),

    #[error("campaign pair {campaign_pair} does not match pair {pair}")]
    PairMismatch { campaign_pair: PairId, pair: PairId },
}

/// Reward-zone thresholds converted into each order's rate domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedBoundary {
    pub target_price: Option<Decimal>,
    pub order0: RewardZoneBoundary,
    pub order1: RewardZoneBoundary,
}

/// Everything about a campaign the accumulators read, shared across them.
#[derive(Debug, Clone)]
pub struct CampaignContext {
    pub campaign: Campaign,
    pub pair: Pair,
    pub schedule: SubEpochSchedule,
    pub usd_rates: UsdRateBook,
    boundaries: TimeSeries<ResolvedBoundary>,
}

impl CampaignContext {
    pub fn new(
        campaign: Campaign,
        pair: Pair,
        settings: &ScheduleSettings,
        usd_rates: Vec<UsdRatePoint>,
        boundaries: Vec<BoundaryPoint>,
    ) -> Result<Self, EngineError> {
        if campaign.pair_id != pair.id {
            return Err(EngineError::PairMismatch {
                campaign_pair: campaign.pair_id,
                pair: pair.id,
            });
        }
        let schedule = SubEpochSchedule::build(&campaign, settings)?;
        let usd_rates = UsdRateBook::new(usd_rates)?;

        let scale = wei_scale(pair.token1.decimals, pair.token0.decimals)?;
        let resolved = boundaries
            .into_iter()
            .map(|point| -> Result<(TimeSec, ResolvedBoundary), MathError> {
                let order0 = RewardZoneBoundary::from_naive_price(
                    &point.order0_price,
                    &scale,
                    OrderSide::Sell,
                )?;
                let order1 = RewardZoneBoundary::from_naive_price(
                    &point.order1_price,
                    &scale,
                    OrderSide::Buy,
                )?;
                Ok((
                    point.timestamp,
                    ResolvedBoundary {
                        target_price: point.target_price,
                        order0,
                        order1,
                    },
                ))
            })
            .collect::<Result<Vec<_>, MathError>>()?;

        debug!(
            campaign_id = %campaign.id,
            ticks = schedule.len(),
            boundaries = resolved.len(),
            "campaign context ready"
        );

        Ok(Self {
            campaign,
            pair,
            schedule,
            usd_rates,
            boundaries: TimeSeries::new(resolved),
        })
    }

    /// Latest boundary known at `at`.
    pub fn boundary_at(&self, at: TimeSec) -> Option<&ResolvedBoundary> {
        self.boundaries.latest_at(at)
    }

    pub fn distributor(&self) -> RewardDistributor {
        RewardDistributor::new(
            self.campaign.id,
            self.campaign.reward_token_decimals,
            SideWeighting {
                weighting: self.campaign.token0_weighting.clone(),
                decimals: self.pair.token0.decimals,
            },
            SideWeighting {
                weighting: self.campaign.token1_weighting.clone(),
                decimals: self.pair.token1.decimals,
            },
        )
    }
}

/// Group events by strategy, dropping events for other pairs.
pub fn group_events(
    events: Vec<StrategyEvent>,
    pair_id: PairId,
) -> BTreeMap<StrategyId, Vec<StrategyEvent>> {
    let mut grouped: BTreeMap<StrategyId, Vec<StrategyEvent>> = BTreeMap::new();
    for event in events {
        if event.pair_id != pair_id {
            continue;
        }
        grouped.entry(event.strategy_id.clone()).or_default().push(event);
    }
    grouped
}

/// Assign rewards tick by tick over per-strategy snapshots.
///
/// Output is ordered by `(sub_epoch_number, strategy_id)` whatever order the
/// strategy batches arrive in.
pub fn merge_and_distribute(
    ctx: &CampaignContext,
    per_strategy: Vec<Vec<StrategyTick>>,
) -> Vec<SubEpochRecord> {
    let mut by_tick: BTreeMap<i64, Vec<StrategyTick>> = BTreeMap::new();
    for snapshot in per_strategy.into_iter().flatten() {
        by_tick.entry(snapshot.tick_number).or_default().push(snapshot);
    }

    let distributor = ctx.distributor();
    let mut records = Vec::new();
    for tick in ctx.schedule.ticks() {
        let snapshots = by_tick.remove(&tick.number).unwrap_or_default();
        if snapshots.is_empty() {
            continue;
        }
        records.extend(distributor.distribute(tick, snapshots));
    }
    if !by_tick.is_empty() {
        warn!(
            campaign_id = %ctx.campaign.id,
            stray_ticks = by_tick.len(),
            "snapshots for unknown sub-epochs dropped"
        );
    }
    records
}

/// Run the whole campaign on the current thread.
pub fn compute_campaign(
    ctx: &CampaignContext,
    events: Vec<StrategyEvent>,
) -> Vec<SubEpochRecord> {
    let per_strategy = group_events(events, ctx.pair.id)
        .into_iter()
        .map(|(strategy_id, events)| accumulate_strategy(ctx, strategy_id, events))
        .collect();
    merge_and_distribute(ctx, per_strategy)
}

/// Totals over one campaign run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CampaignSummary {
    pub records: usize,
    pub strategies: usize,
    pub distributed: Decimal,
    /// Pool shares of settled ticks left unpaid, withheld side portions included.
    pub undistributed: Decimal,
}

impl CampaignSummary {
    /// Totals over `records`, counting pool shares of ticks ending at or
    /// before `as_of`.
    pub fn summarize(ctx: &CampaignContext, records: &[SubEpochRecord], as_of: TimeSec) -> Self {
        let distributed: Decimal = records.iter().map(|r| r.total_reward.clone()).sum();
        let mut strategies: Vec<&StrategyId> = records.iter().map(|r| &r.strategy_id).collect();
        strategies.sort();
        strategies.dedup();
        let pool: Decimal = ctx
            .schedule
            .ticks()
            .iter()
            .filter(|t| t.end <= as_of)
            .map(|t| t.pool_share.clone())
            .sum();
        Self {
            records: records.len(),
            strategies: strategies.len(),
            undistributed: &pool - &distributed,
            distributed,
        }
    }
}
