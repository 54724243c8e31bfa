use crate::datasource::{DataSource, DataSourceError};
use crate::db::{InsertOutcome, RepoError, Repository};
use crate::domain::{sequence_digest, Campaign, CampaignId, SubEpochRecord, TimeSec};
use crate::engine::{
    accumulate_strategy, group_events, merge_and_distribute, CampaignContext, CampaignSummary,
    EngineError, ScheduleSettings,
};
use futures::future::try_join_all;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Clone)]
pub struct Orchestrator {
    datasource: Arc<dyn DataSource>,
    repo: Arc<Repository>,
    settings: ScheduleSettings,
}

/// Outcome of one campaign run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CampaignReport {
    pub campaign_id: CampaignId,
    pub summary: CampaignSummary,
    pub outcome: InsertOutcome,
    pub sequence_digest: String,
    /// Highest sub-epoch stored for the campaign after this run.
    pub last_persisted_sub_epoch: Option<i64>,
}

#[derive(Debug, Default)]
pub struct RunSummary {
    pub reports: Vec<CampaignReport>,
    pub skipped: Vec<CampaignId>,
    pub failed: Vec<(CampaignId, String)>,
}

impl Orchestrator {
    pub fn new(
        datasource: Arc<dyn DataSource>,
        repo: Arc<Repository>,
        settings: ScheduleSettings,
    ) -> Self {
        Self {
            datasource,
            repo,
            settings,
        }
    }

    /// Compute the records of one campaign settled by `as_of`.
    ///
    /// Strategies fold in parallel on the blocking pool; the merge that
    /// follows fixes the output order, so the result does not depend on
    /// which fold finishes first.
    pub async fn compute_campaign(
        &self,
        campaign: Campaign,
        as_of: TimeSec,
    ) -> Result<(Arc<CampaignContext>, Vec<SubEpochRecord>), OrchestrationError> {
        let until = std::cmp::min(as_of, campaign.end_time());
        let pair = self.datasource.fetch_pair(campaign.pair_id).await?;
        let (events, usd_rates, boundaries) = tokio::try_join!(
            self.datasource.fetch_strategy_events(pair.id, until),
            self.datasource.fetch_usd_rates(&pair, until),
            self.datasource.fetch_boundaries(campaign.id, until),
        )?;

        let ctx = Arc::new(CampaignContext::new(
            campaign,
            pair,
            &self.settings,
            usd_rates,
            boundaries,
        )?);

        let folds = group_events(events, ctx.pair.id)
            .into_iter()
            .map(|(strategy_id, events)| {
                let ctx = Arc::clone(&ctx);
                tokio::task::spawn_blocking(move || accumulate_strategy(&ctx, strategy_id, events))
            });
        let per_strategy = try_join_all(folds).await?;

        let mut records = merge_and_distribute(&ctx, per_strategy);
        records.retain(|r| r.sub_epoch_timestamp <= as_of);
        Ok((ctx, records))
    }

    /// Compute and persist one campaign.
    pub async fn run_campaign(
        &self,
        campaign: Campaign,
        as_of: TimeSec,
    ) -> Result<CampaignReport, OrchestrationError> {
        let campaign_id = campaign.id;
        info!(
            campaign_id = %campaign_id,
            name = %campaign.opportunity_name,
            as_of = %as_of,
            "running campaign"
        );

        let (ctx, records) = self.compute_campaign(campaign, as_of).await?;
        let summary = CampaignSummary::summarize(&ctx, &records, as_of);
        let digest = sequence_digest(&records)?;

        let outcome = self.repo.insert_sub_epochs_batch(&records).await?;
        self.repo
            .record_campaign_run(campaign_id, records.len(), &outcome, &digest)
            .await?;
        let last_persisted_sub_epoch = self.repo.last_sub_epoch_number(campaign_id).await?;

        if outcome.diverged > 0 {
            warn!(
                campaign_id = %campaign_id,
                diverged = outcome.diverged,
                "stored records differ from recomputation"
            );
        }
        info!(
            campaign_id = %campaign_id,
            records = summary.records,
            strategies = summary.strategies,
            inserted = outcome.inserted,
            unchanged = outcome.unchanged,
            last_sub_epoch = ?last_persisted_sub_epoch,
            distributed = %summary.distributed,
            undistributed = %summary.undistributed,
            "campaign complete"
        );

        Ok(CampaignReport {
            campaign_id,
            summary,
            outcome,
            sequence_digest: digest,
            last_persisted_sub_epoch,
        })
    }

    /// Run every active campaign that has started by `as_of`, in id order.
    ///
    /// A failing campaign is logged and does not stop the others.
    pub async fn run_all(&self, as_of: TimeSec) -> Result<RunSummary, OrchestrationError> {
        let mut campaigns = self.datasource.fetch_campaigns().await?;
        campaigns.sort_by_key(|c| c.id);

        let mut run = RunSummary::default();
        for campaign in campaigns {
            let campaign_id = campaign.id;
            if !campaign.is_active || campaign.start_time() > as_of {
                info!(campaign_id = %campaign_id, active = campaign.is_active, "skipping campaign");
                run.skipped.push(campaign_id);
                continue;
            }
            match self.run_campaign(campaign, as_of).await {
                Ok(report) => run.reports.push(report),
                Err(e) => {
                    error!(campaign_id = %campaign_id, error = %e, "campaign failed");
                    run.failed.push((campaign_id, e.to_string()));
                }
            }
        }
        Ok(run)
    }
}

#[derive(Debug, Error)]
pub enum OrchestrationError {
    #[error(transparent)]
    DataSource(#[from] DataSourceError),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error("strategy fold panicked: {0}")]
    Join(#[from] tokio::task::JoinError),
    #[error("record encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}
