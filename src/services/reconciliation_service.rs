//! Campaign total reconciliation.
//!
//! Each campaign caches `current_amount_cents` and `donor_count`. The true
//! values are the sum and distinct-donor count of its completed
//! transactions. This module re-sums transactions, reports campaigns whose
//! cached counters differ, and optionally rewrites them.
//!
//! The server runs this periodically (see `run_periodic`); operators can run
//! it by hand with `crowdfund reconcile`.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::time::MissedTickBehavior;
use uuid::Uuid;

use crate::{db::DbPool, error::AppError, models::transaction::TransactionStatus};

/// Cached counters next to the values re-summed from transactions.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct CampaignTotals {
    pub campaign_id: Uuid,
    pub cached_amount_cents: i64,
    pub cached_donor_count: i64,
    pub actual_amount_cents: i64,
    pub actual_donor_count: i64,
}

/// A campaign whose cached counters disagree with its transactions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Discrepancy {
    pub campaign_id: Uuid,
    pub cached_amount_cents: i64,
    pub actual_amount_cents: i64,
    pub cached_donor_count: i64,
    pub actual_donor_count: i64,

    /// `actual - cached`; positive means the cache under-reports
    pub amount_drift_cents: i64,
}

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone, Serialize)]
pub struct ReconcileReport {
    pub campaigns_checked: usize,
    pub discrepancies: Vec<Discrepancy>,

    /// Whether drifted counters were rewritten
    pub applied: bool,

    pub checked_at: DateTime<Utc>,
}

/// Per-campaign totals. Campaigns without completed transactions sum to zero.
///
/// `$1` is the completed status.
const TOTALS_SQL: &str = r#"
    SELECT c.id AS campaign_id,
           c.current_amount_cents AS cached_amount_cents,
           c.donor_count AS cached_donor_count,
           COALESCE(SUM(t.amount_cents), 0)::BIGINT AS actual_amount_cents,
           COUNT(DISTINCT t.donor_id) AS actual_donor_count
    FROM campaigns c
    LEFT JOIN transactions t ON t.campaign_id = c.id AND t.status = $1
    GROUP BY c.id
    ORDER BY c.created_at, c.id
"#;

/// Load cached and re-summed totals for every campaign.
pub async fn scan(pool: &DbPool) -> Result<Vec<CampaignTotals>, AppError> {
    let rows = sqlx::query_as::<_, CampaignTotals>(TOTALS_SQL)
        .bind(TransactionStatus::Completed.as_str())
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

/// Compare cached counters to actual totals, keeping only mismatches.
pub fn find_discrepancies(rows: &[CampaignTotals]) -> Vec<Discrepancy> {
    rows.iter()
        .filter(|r| {
            r.cached_amount_cents != r.actual_amount_cents
                || r.cached_donor_count != r.actual_donor_count
        })
        .map(|r| Discrepancy {
            campaign_id: r.campaign_id,
            cached_amount_cents: r.cached_amount_cents,
            actual_amount_cents: r.actual_amount_cents,
            cached_donor_count: r.cached_donor_count,
            actual_donor_count: r.actual_donor_count,
            amount_drift_cents: r.actual_amount_cents - r.cached_amount_cents,
        })
        .collect()
}

/// Rewrite the counters of the given campaigns from a fresh aggregate.
///
/// The campaign rows are locked first so in-flight donations commit before
/// the aggregate is taken; the UPDATE then runs with a snapshot that
/// includes them.
async fn apply_fixes(pool: &DbPool, campaign_ids: &[Uuid]) -> Result<u64, AppError> {
    let mut tx = pool.begin().await?;

    sqlx::query("SELECT id FROM campaigns WHERE id = ANY($1) ORDER BY id FOR UPDATE")
        .bind(campaign_ids)
        .execute(&mut *tx)
        .await?;

    let updated = sqlx::query(
        r#"
        UPDATE campaigns c
        SET current_amount_cents = totals.amount_cents,
            donor_count = totals.donor_count,
            updated_at = NOW()
        FROM (
            SELECT c2.id,
                   COALESCE(SUM(t.amount_cents), 0)::BIGINT AS amount_cents,
                   COUNT(DISTINCT t.donor_id) AS donor_count
            FROM campaigns c2
            LEFT JOIN transactions t ON t.campaign_id = c2.id AND t.status = $2
            WHERE c2.id = ANY($1)
            GROUP BY c2.id
        ) totals
        WHERE c.id = totals.id
        "#,
    )
    .bind(campaign_ids)
    .bind(TransactionStatus::Completed.as_str())
    .execute(&mut *tx)
    .await?
    .rows_affected();

    tx.commit().await?;

    Ok(updated)
}

/// Run one reconciliation pass.
///
/// With `apply = false` this only reports. With `apply = true` drifted
/// campaigns are rewritten and the report lists what was found before the
/// fix.
pub async fn reconcile(pool: &DbPool, apply: bool) -> Result<ReconcileReport, AppError> {
    let rows = scan(pool).await?;
    let discrepancies = find_discrepancies(&rows);

    let applied = apply && !discrepancies.is_empty();
    if applied {
        let ids: Vec<Uuid> = discrepancies.iter().map(|d| d.campaign_id).collect();
        let updated = apply_fixes(pool, &ids).await?;
        tracing::info!(updated, "rewrote drifted campaign counters");
    }

    Ok(ReconcileReport {
        campaigns_checked: rows.len(),
        discrepancies,
        applied,
        checked_at: Utc::now(),
    })
}

/// Reconcile on a fixed interval until the task is aborted.
///
/// The first tick is skipped so startup is not delayed. Failures are logged
/// and the loop keeps going.
pub async fn run_periodic(pool: DbPool, every: Duration) {
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker.tick().await;

    loop {
        ticker.tick().await;

        match reconcile(&pool, true).await {
            Ok(report) if report.discrepancies.is_empty() => {
                tracing::debug!(
                    campaigns = report.campaigns_checked,
                    "campaign totals consistent"
                );
            }
            Ok(report) => {
                for d in &report.discrepancies {
                    tracing::warn!(
                        campaign_id = %d.campaign_id,
                        cached_amount_cents = d.cached_amount_cents,
                        actual_amount_cents = d.actual_amount_cents,
                        cached_donor_count = d.cached_donor_count,
                        actual_donor_count = d.actual_donor_count,
                        "repaired drifted campaign totals"
                    );
                }
            }
            Err(e) => tracing::error!(error = %e, "campaign reconciliation failed"),
        }
    }
}
