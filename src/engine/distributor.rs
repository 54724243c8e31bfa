//! Splits each tick's reward pool across strategy sides.
//!
//! The pool is first divided between the two token sides by the campaign
//! weightings. Each side's portion then goes to the strategies in proportion
//! to their eligible liquidity in whole tokens, priced in USD, times the
//! seconds of the tick the strategy held orders. Amounts are handed out in
//! reward-token units by largest remainder, so a side never pays out more
//! than its portion.
//!
//! A side whose token has no USD rate, or that has no reward-zone boundary
//! at the tick, pays nothing and its portion stays undistributed.

use super::accumulator::{SideTick, StrategyTick};
use super::schedule::SubEpochTick;
use crate::domain::decimal::pow10;
use crate::domain::{CampaignId, Decimal, SideRecord, SubEpochRecord};
use num_bigint::BigInt;
use num_integer::Integer;
use num_traits::Zero;
use tracing::{debug, warn};

/// Per-side pricing inputs that stay fixed for a campaign.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SideWeighting {
    pub weighting: Decimal,
    pub decimals: i64,
}

#[derive(Debug, Clone)]
pub struct RewardDistributor {
    campaign_id: CampaignId,
    reward_decimals: i64,
    side0: SideWeighting,
    side1: SideWeighting,
}

impl RewardDistributor {
    pub fn new(
        campaign_id: CampaignId,
        reward_decimals: u32,
        side0: SideWeighting,
        side1: SideWeighting,
    ) -> Self {
        Self {
            campaign_id,
            reward_decimals: reward_decimals as i64,
            side0,
            side1,
        }
    }

    /// USD-denominated weight of one side for `covered_seconds`.
    ///
    /// Zero when the side has no USD rate or no boundary.
    pub fn side_weight(
        &self,
        side: &SideTick,
        weighting: &SideWeighting,
        covered_seconds: i64,
    ) -> Decimal {
        let usd_rate = match &side.usd_rate {
            Some(rate) => rate,
            None => return Decimal::zero(),
        };
        if side.boundary.is_none() || !weighting.weighting.is_positive() {
            return Decimal::zero();
        }
        let whole_tokens = &side.split.eligible * &unit_scale(weighting.decimals);
        let usd = &(&whole_tokens * usd_rate) * &weighting.weighting;
        &usd * &Decimal::from_i64(covered_seconds)
    }

    /// Portions of `pool_share` reserved for the token0 and token1 sides.
    pub fn side_portions(&self, pool_share: &Decimal) -> (Decimal, Decimal) {
        let (units0, units1) = self.portion_units(pool_share);
        (
            Decimal::from_scaled_int(units0, self.reward_decimals),
            Decimal::from_scaled_int(units1, self.reward_decimals),
        )
    }

    fn portion_units(&self, pool_share: &Decimal) -> (BigInt, BigInt) {
        let units = pool_share.to_scaled_int(self.reward_decimals);
        let weightings = [self.side0.weighting.clone(), self.side1.weighting.clone()];
        let mut split = largest_remainder(&units, &weightings).into_iter();
        (
            split.next().unwrap_or_default(),
            split.next().unwrap_or_default(),
        )
    }

    /// Assign `tick.pool_share` to the strategies snapshotted at `tick`.
    ///
    /// Records come back ordered by strategy id.
    pub fn distribute(
        &self,
        tick: &SubEpochTick,
        mut snapshots: Vec<StrategyTick>,
    ) -> Vec<SubEpochRecord> {
        snapshots.sort_by(|a, b| a.strategy_id.cmp(&b.strategy_id));

        let (portion0, portion1) = self.portion_units(&tick.pool_share);
        let sides0: Vec<(&SideTick, i64)> =
            snapshots.iter().map(|s| (&s.side0, s.covered_seconds)).collect();
        let sides1: Vec<(&SideTick, i64)> =
            snapshots.iter().map(|s| (&s.side1, s.covered_seconds)).collect();
        let rewards0 = self.allocate_side(tick, "token0", &portion0, &self.side0, &sides0);
        let rewards1 = self.allocate_side(tick, "token1", &portion1, &self.side1, &sides1);

        let records: Vec<SubEpochRecord> = snapshots
            .into_iter()
            .zip(rewards0.into_iter().zip(rewards1))
            .map(|(snapshot, (units0, units1))| {
                let reward0 = Decimal::from_scaled_int(units0, self.reward_decimals);
                let reward1 = Decimal::from_scaled_int(units1, self.reward_decimals);
                self.record(tick, snapshot, reward0, reward1)
            })
            .collect();

        debug!(
            campaign_id = %self.campaign_id,
            sub_epoch = tick.number,
            records = records.len(),
            pool_share = %tick.pool_share,
            "distributed sub-epoch"
        );
        records
    }

    /// Split one side's portion among `sides`.
    ///
    /// All-zero weights allocate nothing, leaving the portion undistributed.
    fn allocate_side(
        &self,
        tick: &SubEpochTick,
        token: &str,
        portion: &BigInt,
        weighting: &SideWeighting,
        sides: &[(&SideTick, i64)],
    ) -> Vec<BigInt> {
        let weights: Vec<Decimal> = sides
            .iter()
            .map(|(side, covered_seconds)| self.side_weight(side, weighting, *covered_seconds))
            .collect();
        let allocation = largest_remainder(portion, &weights);
        if portion.is_zero() || allocation.iter().any(|a| !a.is_zero()) {
            return allocation;
        }

        let withheld = Decimal::from_scaled_int(portion.clone(), self.reward_decimals);
        let unpriced = sides.iter().filter(|(s, _)| s.usd_rate.is_none()).count();
        let unbounded = sides.iter().filter(|(s, _)| s.boundary.is_none()).count();
        if unpriced > 0 || unbounded > 0 {
            warn!(
                campaign_id = %self.campaign_id,
                sub_epoch = tick.number,
                token,
                unpriced,
                unbounded,
                withheld = %withheld,
                "side reward deferred, portion withheld"
            );
        } else {
            debug!(
                campaign_id = %self.campaign_id,
                sub_epoch = tick.number,
                token,
                withheld = %withheld,
                "no eligible weight on side, portion undistributed"
            );
        }
        allocation
    }

    fn record(
        &self,
        tick: &SubEpochTick,
        snapshot: StrategyTick,
        reward0: Decimal,
        reward1: Decimal,
    ) -> SubEpochRecord {
        let total_reward = &reward0 + &reward1;
        SubEpochRecord {
            campaign_id: self.campaign_id,
            strategy_id: snapshot.strategy_id,
            epoch_number: tick.epoch_number,
            sub_epoch_number: tick.number,
            epoch_start: tick.epoch_start,
            sub_epoch_timestamp: tick.end,
            target_price: snapshot.target_price,
            covered_fraction: snapshot.covered_fraction,
            token0: side_record(snapshot.side0, &self.side0, reward0),
            token1: side_record(snapshot.side1, &self.side1, reward1),
            total_reward,
            last_event_timestamp: snapshot.provenance.last_event_timestamp,
            last_processed_block: snapshot.provenance.last_processed_block,
            owner_address: snapshot.provenance.owner,
        }
    }
}

fn side_record(side: SideTick, weighting: &SideWeighting, reward: Decimal) -> SideRecord {
    SideRecord {
        liquidity: side.order.y,
        eligible: side.split.eligible,
        ineligible: side.split.ineligible,
        reward_zone_boundary: side.boundary.map(|b| b.rate().clone()),
        usd_rate: side.usd_rate,
        weighting: weighting.weighting.clone(),
        decimals: weighting.decimals,
        z: side.order.z,
        a_compressed: side.order.a_compressed,
        b_compressed: side.order.b_compressed,
        marginal_price: side.marginal_price,
        reward,
    }
}

/// `10^-decimals`, exact.
fn unit_scale(decimals: i64) -> Decimal {
    if decimals >= 0 {
        Decimal::from_scaled_int(BigInt::from(1), decimals)
    } else {
        Decimal::from_bigint(pow10(decimals.unsigned_abs() as u32))
    }
}

/// Split `units` proportionally to `weights` in whole units.
///
/// Each slot gets the floor of its exact quota; leftover units go one each
/// to the largest remainders, earlier slots first on ties. Negative weights
/// count as zero. All-zero weights allocate nothing.
pub fn largest_remainder(units: &BigInt, weights: &[Decimal]) -> Vec<BigInt> {
    let scale = weights
        .iter()
        .map(|w| w.inner().as_bigint_and_exponent().1)
        .max()
        .unwrap_or(0)
        .max(0);
    let scaled: Vec<BigInt> = weights
        .iter()
        .map(|w| {
            if w.is_positive() {
                w.to_scaled_int(scale)
            } else {
                BigInt::zero()
            }
        })
        .collect();
    let total: BigInt = scaled.iter().sum();
    if total.is_zero() || units <= &BigInt::zero() {
        return vec![BigInt::zero(); weights.len()];
    }

    let mut allocation = Vec::with_capacity(weights.len());
    let mut remainders = Vec::with_capacity(weights.len());
    for (idx, weight) in scaled.iter().enumerate() {
        let (quota, remainder) = (units * weight).div_mod_floor(&total);
        allocation.push(quota);
        remainders.push((remainder, idx));
    }

    let assigned: BigInt = allocation.iter().sum();
    let mut leftover = units - assigned;
    remainders.sort_by(|(ra, ia), (rb, ib)| rb.cmp(ra).then(ia.cmp(ib)));
    for (_, idx) in remainders {
        if leftover <= BigInt::zero() {
            break;
        }
        allocation[idx] += 1;
        leftover -= 1;
    }
    allocation
}
