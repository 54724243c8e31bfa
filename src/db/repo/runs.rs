//! Campaign run bookkeeping.

use crate::domain::CampaignId;
use sqlx::Row;

use super::{InsertOutcome, RepoError, Repository};

/// One finished campaign computation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CampaignRun {
    pub campaign_id: CampaignId,
    pub records: i64,
    pub inserted: i64,
    pub diverged: i64,
    pub sequence_digest: String,
    pub finished_at: i64,
}

impl Repository {
    pub async fn record_campaign_run(
        &self,
        campaign_id: CampaignId,
        records: usize,
        outcome: &InsertOutcome,
        sequence_digest: &str,
    ) -> Result<(), RepoError> {
        sqlx::query(
            r#"
            INSERT INTO campaign_runs (
                campaign_id, records, inserted, diverged, sequence_digest, finished_at
            ) VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(campaign_id.0)
        .bind(records as i64)
        .bind(outcome.inserted as i64)
        .bind(outcome.diverged as i64)
        .bind(sequence_digest)
        .bind(chrono::Utc::now().timestamp_millis())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Most recent run of a campaign.
    pub async fn last_campaign_run(
        &self,
        campaign_id: CampaignId,
    ) -> Result<Option<CampaignRun>, RepoError> {
        let row = sqlx::query(
            r#"
            SELECT campaign_id, records, inserted, diverged, sequence_digest, finished_at
            FROM campaign_runs
            WHERE campaign_id = ?
            ORDER BY id DESC
            LIMIT 1
            "#,
        )
        .bind(campaign_id.0)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| CampaignRun {
            campaign_id: CampaignId(row.get("campaign_id")),
            records: row.get("records"),
            inserted: row.get("inserted"),
            diverged: row.get("diverged"),
            sequence_digest: row.get("sequence_digest"),
            finished_at: row.get("finished_at"),
        }))
    }
}
