//! Sub-epoch record operations for the repository.

use crate::domain::{CampaignId, Decimal, StrategyId, SubEpochRecord};
use sqlx::Row;
use tracing::warn;

use super::{InsertOutcome, RepoError, Repository};

impl Repository {
    /// Append records in one transaction.
    ///
    /// A record whose key is already stored is never overwritten. If the
    /// stored digest differs, the row is counted as diverged and logged.
    pub async fn insert_sub_epochs_batch(
        &self,
        records: &[SubEpochRecord],
    ) -> Result<InsertOutcome, RepoError> {
        let mut outcome = InsertOutcome::default();
        if records.is_empty() {
            return Ok(outcome);
        }

        let created_at = chrono::Utc::now().timestamp_millis();
        let mut tx = self.pool.begin().await?;

        for record in records {
            let json = record.canonical_json()?;
            let digest = record.digest()?;
            let result = sqlx::query(
                r#"
                INSERT INTO sub_epochs (
                    campaign_id, strategy_id, epoch_number, sub_epoch_number,
                    epoch_start, sub_epoch_timestamp, owner_address, total_reward,
                    last_processed_block, record_json, digest, created_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT DO NOTHING
                "#,
            )
            .bind(record.campaign_id.0)
            .bind(record.strategy_id.as_str())
            .bind(record.epoch_number)
            .bind(record.sub_epoch_number)
            .bind(record.epoch_start.as_secs())
            .bind(record.sub_epoch_timestamp.as_secs())
            .bind(record.owner_address.as_str())
            .bind(record.total_reward.to_canonical_string())
            .bind(record.last_processed_block)
            .bind(json.as_str())
            .bind(digest.as_str())
            .bind(created_at)
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() > 0 {
                outcome.inserted += 1;
                continue;
            }

            let stored: Vec<String> = sqlx::query(
                r#"
                SELECT digest FROM sub_epochs
                WHERE campaign_id = ? AND strategy_id = ?
                  AND (sub_epoch_number = ? OR sub_epoch_timestamp = ?)
                "#,
            )
            .bind(record.campaign_id.0)
            .bind(record.strategy_id.as_str())
            .bind(record.sub_epoch_number)
            .bind(record.sub_epoch_timestamp.as_secs())
            .fetch_all(&mut *tx)
            .await?
            .iter()
            .map(|row| row.get::<String, _>("digest"))
            .collect();

            if stored.iter().all(|d| *d == digest) {
                outcome.unchanged += 1;
            } else {
                outcome.diverged += 1;
                warn!(
                    campaign_id = %record.campaign_id,
                    strategy = %record.strategy_id,
                    sub_epoch = record.sub_epoch_number,
                    "recomputed sub-epoch differs from stored record, keeping stored"
                );
            }
        }

        tx.commit().await?;
        Ok(outcome)
    }

    /// Stored records of a campaign, optionally for one strategy, ordered by
    /// `(sub_epoch_number, strategy_id)`.
    pub async fn query_sub_epochs(
        &self,
        campaign_id: CampaignId,
        strategy_id: Option<&StrategyId>,
    ) -> Result<Vec<SubEpochRecord>, RepoError> {
        let rows = sqlx::query(
            r#"
            SELECT record_json FROM sub_epochs
            WHERE campaign_id = ? AND (? IS NULL OR strategy_id = ?)
            ORDER BY sub_epoch_number ASC, strategy_id ASC
            "#,
        )
        .bind(campaign_id.0)
        .bind(strategy_id.map(|s| s.as_str()))
        .bind(strategy_id.map(|s| s.as_str()))
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let json: String = row.get("record_json");
                serde_json::from_str(&json).map_err(RepoError::from)
            })
            .collect()
    }

    /// Exact sum of stored rewards for a campaign.
    pub async fn campaign_reward_total(
        &self,
        campaign_id: CampaignId,
    ) -> Result<Decimal, RepoError> {
        let rows = sqlx::query("SELECT total_reward FROM sub_epochs WHERE campaign_id = ?")
            .bind(campaign_id.0)
            .fetch_all(&self.pool)
            .await?;

        let mut total = Decimal::zero();
        for row in rows {
            let raw: String = row.get("total_reward");
            let value = Decimal::from_str_canonical(&raw)
                .map_err(|e| RepoError::Corrupt(format!("total_reward {}: {}", raw, e)))?;
            total = &total + &value;
        }
        Ok(total)
    }

    /// Highest stored sub-epoch number for a campaign.
    pub async fn last_sub_epoch_number(
        &self,
        campaign_id: CampaignId,
    ) -> Result<Option<i64>, RepoError> {
        let row = sqlx::query(
            "SELECT MAX(sub_epoch_number) AS last FROM sub_epochs WHERE campaign_id = ?",
        )
        .bind(campaign_id.0)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.get::<Option<i64>, _>("last"))
    }
}
