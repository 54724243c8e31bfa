//! Sub-epoch tick layout and per-tick reward pool apportionment.

use super::EngineError;
use crate::domain::{Campaign, Decimal, TimeSec};
use num_bigint::BigInt;
use num_integer::Integer;
use serde::{Deserialize, Serialize};

/// How the campaign reward is spread across ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Apportionment {
    /// Proportional to tick duration.
    Even,
    /// Linearly decaying per tick: the first tick weighs `n`, the last `1`.
    FrontLoaded,
}

impl Apportionment {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "even" => Some(Apportionment::Even),
            "front_loaded" | "frontloaded" => Some(Apportionment::FrontLoaded),
            _ => None,
        }
    }
}

/// Tick widths and apportionment, before campaign overrides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleSettings {
    pub sub_epoch_seconds: i64,
    pub epoch_seconds: i64,
    pub apportionment: Apportionment,
}

/// One sub-epoch: the interval `[start, end)` snapshotted at `end`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubEpochTick {
    /// 1-based, unique within the campaign.
    pub number: i64,
    pub start: TimeSec,
    pub end: TimeSec,
    pub epoch_number: i64,
    pub epoch_start: TimeSec,
    /// Reward allotted to this tick, in reward-token units.
    pub pool_share: Decimal,
}

impl SubEpochTick {
    pub fn duration(&self) -> i64 {
        self.end.as_secs() - self.start.as_secs()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubEpochSchedule {
    ticks: Vec<SubEpochTick>,
}

impl SubEpochSchedule {
    /// Lay out ticks over `[campaign.start, campaign.end)`. Campaign-level
    /// widths override `settings`.
    ///
    /// Shares are cumulative floors of the campaign amount in reward-token
    /// units, so they always add up to the full amount.
    pub fn build(campaign: &Campaign, settings: &ScheduleSettings) -> Result<Self, EngineError> {
        let width = campaign.sub_epoch_seconds.unwrap_or(settings.sub_epoch_seconds);
        let epoch_width = campaign.epoch_seconds.unwrap_or(settings.epoch_seconds);
        if width <= 0 || epoch_width <= 0 {
            return Err(EngineError::InvalidSchedule(format!(
                "tick widths must be positive (sub-epoch {}, epoch {})",
                width, epoch_width
            )));
        }
        let start = campaign.start_time().as_secs();
        let end = campaign.end_time().as_secs();
        if end <= start {
            return Err(EngineError::InvalidSchedule(format!(
                "campaign {} ends at {} before it starts at {}",
                campaign.id, end, start
            )));
        }
        if campaign.reward_amount.is_negative() {
            return Err(EngineError::InvalidSchedule(format!(
                "campaign {} has negative reward amount {}",
                campaign.id, campaign.reward_amount
            )));
        }

        let mut bounds = Vec::new();
        let mut tick_start = start;
        while tick_start < end {
            let tick_end = tick_start.saturating_add(width).min(end);
            bounds.push((tick_start, tick_end));
            tick_start = tick_end;
        }

        let decimals = campaign.reward_token_decimals as i64;
        let units = campaign.reward_amount.to_scaled_int(decimals);
        let count = bounds.len() as i64;
        let total_weight = match settings.apportionment {
            Apportionment::Even => BigInt::from(end - start),
            Apportionment::FrontLoaded => BigInt::from(count * (count + 1) / 2),
        };
        let cumulative_weight = |k: i64| -> BigInt {
            match settings.apportionment {
                Apportionment::Even => {
                    let elapsed = if k >= count { end } else { bounds[k as usize].0 };
                    BigInt::from(elapsed - start)
                }
                Apportionment::FrontLoaded => BigInt::from(k * count - k * (k - 1) / 2),
            }
        };
        let cumulative_units =
            |k: i64| -> BigInt { (&units * cumulative_weight(k)).div_floor(&total_weight) };

        let ticks = bounds
            .iter()
            .enumerate()
            .map(|(k, (tick_start, tick_end))| {
                let k = k as i64;
                let epoch_index = (tick_start - start) / epoch_width;
                let share = cumulative_units(k + 1) - cumulative_units(k);
                SubEpochTick {
                    number: k + 1,
                    start: TimeSec::new(*tick_start),
                    end: TimeSec::new(*tick_end),
                    epoch_number: epoch_index + 1,
                    epoch_start: TimeSec::new(start + epoch_index * epoch_width),
                    pool_share: Decimal::from_scaled_int(share, decimals),
                }
            })
            .collect();

        Ok(Self { ticks })
    }

    pub fn ticks(&self) -> &[SubEpochTick] {
        &self.ticks
    }

    pub fn len(&self) -> usize {
        self.ticks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ticks.is_empty()
    }
}
