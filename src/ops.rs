//! Operational subcommands: migrations, reconciliation, connectivity
//! checks and data repair.
//!
//! These print human-readable results to stdout; logging still goes
//! through `tracing`.

use std::time::Duration;

use anyhow::{Context, bail};

use crate::{
    cli::{CheckCommand, PromoteAdminCommand, ReconcileCommand},
    config::Config,
    db::{self, DbPool},
    handlers::health::HealthResponse,
    models::user::Role,
    services::reconciliation_service::{self, ReconcileReport},
};

async fn connect(config: &Config) -> anyhow::Result<DbPool> {
    db::create_pool(&config.database_url, config.database_max_connections)
        .await
        .context("failed to connect to the database")
}

/// `crowdfund migrate`
pub async fn migrate(config: &Config) -> anyhow::Result<()> {
    let pool = connect(config).await?;
    db::run_migrations(&pool).await?;
    println!("Migrations applied.");
    Ok(())
}

/// `crowdfund reconcile [--apply] [--json]`
pub async fn reconcile(config: &Config, cmd: &ReconcileCommand) -> anyhow::Result<()> {
    let pool = connect(config).await?;
    let report = reconciliation_service::reconcile(&pool, cmd.apply).await?;

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", format_report(&report));
    }
    Ok(())
}

/// Plain-text rendering of a reconciliation report.
pub fn format_report(report: &ReconcileReport) -> String {
    let mut out = format!(
        "Checked {} campaign(s), {} with drifted totals.\n",
        report.campaigns_checked,
        report.discrepancies.len()
    );

    if report.discrepancies.is_empty() {
        return out;
    }

    out.push_str(&format!(
        "{:<36}  {:>14}  {:>14}  {:>12}  {:>7}  {:>7}\n",
        "campaign", "cached_cents", "actual_cents", "drift_cents", "cached", "actual"
    ));
    for d in &report.discrepancies {
        out.push_str(&format!(
            "{:<36}  {:>14}  {:>14}  {:>12}  {:>7}  {:>7}\n",
            d.campaign_id,
            d.cached_amount_cents,
            d.actual_amount_cents,
            d.amount_drift_cents,
            d.cached_donor_count,
            d.actual_donor_count
        ));
    }

    if report.applied {
        out.push_str("Counters rewritten from transactions.\n");
    } else {
        out.push_str("Dry run; re-run with --apply to repair.\n");
    }
    out
}

/// `<base>/health`, tolerating a trailing slash on the base URL.
pub fn health_url(base: &str) -> String {
    format!("{}/health", base.trim_end_matches('/'))
}

async fn check_http(base: &str) -> anyhow::Result<HealthResponse> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()?;

    let response = client
        .get(health_url(base))
        .send()
        .await?
        .error_for_status()?;

    Ok(response.json::<HealthResponse>().await?)
}

/// `crowdfund check [--url URL]`
///
/// Checks the HTTP server and the database independently so an operator
/// can tell which side is down.
pub async fn check(config: &Config, cmd: &CheckCommand) -> anyhow::Result<()> {
    let base = cmd.url.clone().unwrap_or_else(|| config.local_base_url());
    let mut failed = false;

    match check_http(&base).await {
        Ok(health) => println!(
            "server    ok    {} (status={}, database={})",
            base, health.status, health.database
        ),
        Err(e) => {
            failed = true;
            println!("server    FAIL  {base}: {e:#}");
        }
    }

    let database = async {
        let pool = connect(config).await?;
        db::ping(&pool).await?;
        anyhow::Ok(())
    };
    match database.await {
        Ok(()) => println!("database  ok"),
        Err(e) => {
            failed = true;
            println!("database  FAIL  {e:#}");
        }
    }

    if failed {
        bail!("connectivity check failed");
    }
    Ok(())
}

/// `crowdfund promote-admin <email>`
pub async fn promote_admin(config: &Config, cmd: &PromoteAdminCommand) -> anyhow::Result<()> {
    let pool = connect(config).await?;
    let email = cmd.email.trim().to_lowercase();

    let updated = sqlx::query("UPDATE users SET role = $1, updated_at = NOW() WHERE email = $2")
        .bind(Role::Admin.as_str())
        .bind(&email)
        .execute(&pool)
        .await?
        .rows_affected();

    if updated == 0 {
        bail!("no user registered with email {email}");
    }

    tracing::info!(%email, "user promoted to admin");
    println!("{email} is now an admin.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::reconciliation_service::Discrepancy;
    use chrono::Utc;
    use uuid::Uuid;

    fn report(discrepancies: Vec<Discrepancy>, applied: bool) -> ReconcileReport {
        ReconcileReport {
            campaigns_checked: 3,
            discrepancies,
            applied,
            checked_at: Utc::now(),
        }
    }

    #[test]
    fn test_health_url() {
        assert_eq!(
            health_url("http://localhost:3000"),
            "http://localhost:3000/health"
        );
        assert_eq!(
            health_url("http://localhost:3000/"),
            "http://localhost:3000/health"
        );
    }

    #[test]
    fn test_clean_report_is_one_line() {
        let text = format_report(&report(vec![], false));
        assert_eq!(text, "Checked 3 campaign(s), 0 with drifted totals.\n");
    }

    #[test]
    fn test_report_lists_drift() {
        let id = Uuid::new_v4();
        let text = format_report(&report(
            vec![Discrepancy {
                campaign_id: id,
                cached_amount_cents: 100,
                actual_amount_cents: 350,
                cached_donor_count: 1,
                actual_donor_count: 2,
                amount_drift_cents: 250,
            }],
            false,
        ));

        assert!(text.contains(&id.to_string()));
        assert!(text.contains("250"));
        assert!(text.ends_with("Dry run; re-run with --apply to repair.\n"));
    }

    #[test]
    fn test_applied_report_says_so() {
        let text = format_report(&report(
            vec![Discrepancy {
                campaign_id: Uuid::new_v4(),
                cached_amount_cents: 0,
                actual_amount_cents: 10,
                cached_donor_count: 0,
                actual_donor_count: 1,
                amount_drift_cents: 10,
            }],
            true,
        ));
        assert!(text.ends_with("Counters rewritten from transactions.\n"));
    }
}
