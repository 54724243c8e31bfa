//! End-to-end runs through the orchestrator against a temporary SQLite store.

use chrono::{TimeZone, Utc};
use num_bigint::BigInt;
use std::sync::Arc;
use strategy_rewards::datasource::MockDataSource;
use strategy_rewards::db::init_db;
use strategy_rewards::domain::{
    Address, Campaign, CampaignId, EncodedOrder, EventKind, Pair, PairId, StrategyEvent,
    StrategyId, TimeSec, TokenMeta,
};
use strategy_rewards::engine::{Apportionment, BoundaryPoint, ScheduleSettings, UsdRatePoint};
use strategy_rewards::{Decimal, Orchestrator, Repository};
use tempfile::TempDir;

fn d(s: &str) -> Decimal {
    Decimal::from_str_canonical(s).unwrap()
}

fn campaign(id: i64, active: bool) -> Campaign {
    Campaign {
        id: CampaignId(id),
        pair_id: PairId(1),
        reward_amount: d("12"),
        reward_token_address: Address::new("0xreward".to_string()),
        reward_token_decimals: 6,
        start_date: Utc.timestamp_opt(0, 0).unwrap(),
        end_date: Utc.timestamp_opt(1200, 0).unwrap(),
        opportunity_name: "flat".to_string(),
        is_active: active,
        token0_weighting: Decimal::one(),
        token1_weighting: Decimal::one(),
        sub_epoch_seconds: None,
        epoch_seconds: None,
    }
}

fn pair() -> Pair {
    Pair {
        id: PairId(1),
        token0: TokenMeta {
            address: Address::new("0xbase".to_string()),
            decimals: 0,
        },
        token1: TokenMeta {
            address: Address::new("0xquote".to_string()),
            decimals: 0,
        },
    }
}

/// A flat order at price 1: mantissa 2^47 with exponent 1 decompresses to 2^48.
fn flat_order(y: i64) -> EncodedOrder {
    EncodedOrder::new(
        BigInt::from(y),
        BigInt::from(y),
        BigInt::from(0),
        BigInt::from((1u64 << 48) | (1u64 << 47)),
    )
}

fn created(id: &str, timestamp: i64, block: i64, y: i64) -> StrategyEvent {
    StrategyEvent {
        strategy_id: StrategyId::new(id.to_string()),
        pair_id: PairId(1),
        kind: EventKind::Created,
        timestamp: TimeSec::new(timestamp),
        block_number: block,
        transaction_index: 0,
        log_index: 0,
        order0: flat_order(y),
        order1: flat_order(y),
        owner: Address::new("0xowner".to_string()),
    }
}

fn datasource() -> MockDataSource {
    let mut source = MockDataSource::new()
        .with_campaign(campaign(2, false))
        .with_campaign(campaign(1, true))
        .with_pair(pair())
        .with_events(vec![created("a", 0, 1, 3), created("b", 0, 2, 1)]);
    for token in ["0xbase", "0xquote"] {
        source = source.with_usd_rate(UsdRatePoint {
            token: Address::new(token.to_string()),
            timestamp: TimeSec::new(0),
            usd_rate: Decimal::one(),
        });
    }
    source.with_boundary(
        CampaignId(1),
        BoundaryPoint {
            timestamp: TimeSec::new(0),
            target_price: Some(Decimal::one()),
            order0_price: Decimal::one(),
            order1_price: Decimal::one(),
        },
    )
}

async fn setup() -> (Orchestrator, Arc<Repository>, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir
        .path()
        .join("rewards.db")
        .to_string_lossy()
        .to_string();
    let pool = init_db(&db_path).await.expect("init_db failed");
    let repo = Arc::new(Repository::new(pool));
    let settings = ScheduleSettings {
        sub_epoch_seconds: 300,
        epoch_seconds: 600,
        apportionment: Apportionment::Even,
    };
    let orchestrator = Orchestrator::new(Arc::new(datasource()), repo.clone(), settings);
    (orchestrator, repo, temp_dir)
}

#[tokio::test]
async fn test_run_all_persists_active_campaigns() {
    let (orchestrator, repo, _temp) = setup().await;

    let run = orchestrator.run_all(TimeSec::new(1200)).await.unwrap();
    assert_eq!(run.skipped, vec![CampaignId(2)]);
    assert!(run.failed.is_empty());
    assert_eq!(run.reports.len(), 1);
    assert_eq!(run.reports[0].outcome.inserted, 8);

    let stored = repo.query_sub_epochs(CampaignId(1), None).await.unwrap();
    assert_eq!(stored.len(), 8);
    // 3 per tick split 3:1
    let a: Vec<_> = stored
        .iter()
        .filter(|r| r.strategy_id.as_str() == "a")
        .map(|r| r.total_reward.clone())
        .collect();
    assert_eq!(a, vec![d("2.25"); 4]);
    assert_eq!(repo.campaign_reward_total(CampaignId(1)).await.unwrap(), d("12"));
    assert_eq!(repo.last_sub_epoch_number(CampaignId(2)).await.unwrap(), None);
}

#[tokio::test]
async fn test_rerun_is_idempotent() {
    let (orchestrator, repo, _temp) = setup().await;

    let first = orchestrator.run_campaign(campaign(1, true), TimeSec::new(1200)).await.unwrap();
    let second = orchestrator.run_campaign(campaign(1, true), TimeSec::new(1200)).await.unwrap();

    assert_eq!(first.sequence_digest, second.sequence_digest);
    assert_eq!(second.outcome.inserted, 0);
    assert_eq!(second.outcome.unchanged, 8);
    assert_eq!(second.outcome.diverged, 0);

    let run = repo.last_campaign_run(CampaignId(1)).await.unwrap().unwrap();
    assert_eq!(run.sequence_digest, first.sequence_digest);
}

#[tokio::test]
async fn test_partial_run_then_catch_up() {
    let (orchestrator, repo, _temp) = setup().await;

    let early = orchestrator.run_campaign(campaign(1, true), TimeSec::new(650)).await.unwrap();
    assert_eq!(early.outcome.inserted, 4);
    assert_eq!(early.summary.undistributed, Decimal::zero());
    assert_eq!(early.last_persisted_sub_epoch, Some(2));
    assert_eq!(repo.last_sub_epoch_number(CampaignId(1)).await.unwrap(), Some(2));

    let late = orchestrator.run_campaign(campaign(1, true), TimeSec::new(5000)).await.unwrap();
    assert_eq!(late.outcome.inserted, 4);
    assert_eq!(late.outcome.unchanged, 4);
    assert_eq!(late.last_persisted_sub_epoch, Some(4));
    assert_eq!(repo.campaign_reward_total(CampaignId(1)).await.unwrap(), d("12"));
}

#[test]
fn test_campaign_not_started_is_skipped() {
    tokio_test::block_on(async {
        let (orchestrator, _repo, _temp) = setup().await;
        let run = orchestrator.run_all(TimeSec::new(-1)).await.unwrap();
        assert!(run.reports.is_empty());
        assert_eq!(run.skipped, vec![CampaignId(1), CampaignId(2)]);
    });
}
