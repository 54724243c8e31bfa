//! Point-in-time lookups over externally supplied time series.

use super::EngineError;
use crate::domain::{Address, Decimal, TimeSec};
use crate::math::MathError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Values keyed by timestamp; lookups return the latest point at or before
/// the requested instant, never a later one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeSeries<T> {
    points: Vec<(TimeSec, T)>,
}

impl<T> TimeSeries<T> {
    /// Build a series; points are sorted by time, later duplicates win.
    pub fn new(mut points: Vec<(TimeSec, T)>) -> Self {
        points.sort_by_key(|(t, _)| *t);
        let mut deduped: Vec<(TimeSec, T)> = Vec::with_capacity(points.len());
        for (t, v) in points {
            match deduped.last_mut() {
                Some(last) if last.0 == t => last.1 = v,
                _ => deduped.push((t, v)),
            }
        }
        Self { points: deduped }
    }

    pub fn latest_at(&self, at: TimeSec) -> Option<&T> {
        let idx = self.points.partition_point(|(t, _)| *t <= at);
        idx.checked_sub(1).map(|i| &self.points[i].1)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

impl<T> Default for TimeSeries<T> {
    fn default() -> Self {
        Self { points: Vec::new() }
    }
}

/// A USD quote for one token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsdRatePoint {
    pub token: Address,
    pub timestamp: TimeSec,
    pub usd_rate: Decimal,
}

/// USD quotes per token.
#[derive(Debug, Clone, Default)]
pub struct UsdRateBook {
    by_token: BTreeMap<Address, TimeSeries<Decimal>>,
}

impl UsdRateBook {
    /// Token addresses are matched case-insensitively.
    pub fn new(points: Vec<UsdRatePoint>) -> Result<Self, EngineError> {
        let mut grouped: BTreeMap<Address, Vec<(TimeSec, Decimal)>> = BTreeMap::new();
        for point in points {
            if point.usd_rate.is_negative() {
                return Err(MathError::InvalidArgument(format!(
                    "negative usd rate {} for {}",
                    point.usd_rate, point.token
                ))
                .into());
            }
            grouped
                .entry(normalize(&point.token))
                .or_default()
                .push((point.timestamp, point.usd_rate));
        }
        Ok(Self {
            by_token: grouped
                .into_iter()
                .map(|(token, points)| (token, TimeSeries::new(points)))
                .collect(),
        })
    }

    pub fn rate_at(&self, token: &Address, at: TimeSec) -> Result<&Decimal, EngineError> {
        self.by_token
            .get(&normalize(token))
            .and_then(|series| series.latest_at(at))
            .ok_or_else(|| EngineError::MissingUsdRate {
                token: token.clone(),
                at,
            })
    }
}

fn normalize(address: &Address) -> Address {
    Address::new(address.as_str().trim().to_lowercase())
}

/// Reward-zone thresholds for one instant, as naive quote-per-base prices.
///
/// How the target price moves is decided upstream; the engine only reads it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundaryPoint {
    pub timestamp: TimeSec,
    #[serde(default)]
    pub target_price: Option<Decimal>,
    /// Threshold for the sell order (order0): asks at or below earn rewards.
    pub order0_price: Decimal,
    /// Threshold for the buy order (order1): bids at or above earn rewards.
    pub order1_price: Decimal,
}
