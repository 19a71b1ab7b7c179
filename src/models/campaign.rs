//! Campaign data models and API request/response types.
//!
//! This module defines:
//! - `Campaign`: Database entity representing a fundraising campaign
//! - `CampaignStatus`: Lifecycle state of a campaign
//! - Request types for creating, updating, and listing campaigns
//! - `CampaignResponse`: Response body returned to clients

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::pagination::PageParams;

/// Represents a campaign record from the database.
///
/// # Cached Counters
///
/// `current_amount_cents` and `donor_count` are denormalised from the
/// `transactions` table. Donations and refunds keep them in step inside the
/// same database transaction; the reconciliation pass repairs any drift.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Campaign {
    pub id: Uuid,

    /// User who created the campaign and may edit it
    pub creator_id: Uuid,

    pub title: String,
    pub description: String,
    pub category: Option<String>,
    pub image_url: Option<String>,

    /// Funding target in cents (always > 0)
    pub goal_cents: i64,

    /// Sum of completed donations in cents
    pub current_amount_cents: i64,

    /// Number of distinct donors with at least one completed donation
    pub donor_count: i64,

    /// `active`, `completed`, or `cancelled`
    pub status: String,

    /// Donations are refused after this instant, when set
    pub deadline: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Campaign {
    /// Whether a donation made at `now` should be accepted.
    pub fn accepts_donations(&self, now: DateTime<Utc>) -> bool {
        self.status == CampaignStatus::Active.as_str() && self.deadline.is_none_or(|d| d > now)
    }

    /// Funding progress as a whole percentage. Can exceed 100.
    pub fn progress_percent(&self) -> i64 {
        if self.goal_cents <= 0 {
            return 0;
        }
        self.current_amount_cents.saturating_mul(100) / self.goal_cents
    }
}

/// Lifecycle state of a campaign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CampaignStatus {
    Active,
    Completed,
    Cancelled,
}

impl CampaignStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CampaignStatus::Active => "active",
            CampaignStatus::Completed => "completed",
            CampaignStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for CampaignStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CampaignStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(CampaignStatus::Active),
            "completed" => Ok(CampaignStatus::Completed),
            "cancelled" => Ok(CampaignStatus::Cancelled),
            other => Err(format!(
                "Unknown campaign status '{other}' (expected active, completed, or cancelled)"
            )),
        }
    }
}

/// Request body for `POST /api/v1/campaigns`.
///
/// ```json
/// {
///   "title": "Community garden",
///   "description": "Raised beds for the east lot",
///   "goal_cents": 500000,
///   "category": "community",
///   "image_url": "https://example.com/garden.jpg",
///   "deadline": "2026-12-31T23:59:59Z"
/// }
/// ```
#[derive(Debug, Deserialize)]
pub struct CreateCampaignRequest {
    pub title: String,

    #[serde(default)]
    pub description: String,

    pub goal_cents: i64,
    pub category: Option<String>,
    pub image_url: Option<String>,
    pub deadline: Option<DateTime<Utc>>,
}

/// Request body for `PUT /api/v1/campaigns/{id}`.
///
/// Absent fields keep their current value.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateCampaignRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub goal_cents: Option<i64>,
    pub category: Option<String>,
    pub image_url: Option<String>,
    pub deadline: Option<DateTime<Utc>>,
    pub status: Option<CampaignStatus>,
}

/// Query string for `GET /api/v1/campaigns`.
///
/// `status` is kept as a string so an unknown value yields a 400 with a
/// useful message instead of a generic query rejection.
#[derive(Debug, Default, Deserialize)]
pub struct ListCampaignsQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub status: Option<String>,
    pub category: Option<String>,
    pub search: Option<String>,
    pub creator_id: Option<Uuid>,
}

impl ListCampaignsQuery {
    pub fn pagination(&self) -> PageParams {
        PageParams {
            page: self.page,
            per_page: self.per_page,
        }
    }
}

/// Validated filters for a campaign listing.
#[derive(Debug, Default, Clone)]
pub struct CampaignFilter {
    pub status: Option<CampaignStatus>,
    pub category: Option<String>,
    pub search: Option<String>,
    pub creator_id: Option<Uuid>,
}

/// Response body for campaign endpoints.
///
/// ```json
/// {
///   "id": "550e8400-e29b-41d4-a716-446655440000",
///   "creator_id": "660e8400-e29b-41d4-a716-446655440001",
///   "title": "Community garden",
///   "goal_cents": 500000,
///   "current_amount_cents": 125000,
///   "donor_count": 14,
///   "progress_percent": 25,
///   "status": "active",
///   ...
/// }
/// ```
#[derive(Debug, Serialize)]
pub struct CampaignResponse {
    pub id: Uuid,
    pub creator_id: Uuid,
    pub title: String,
    pub description: String,
    pub category: Option<String>,
    pub image_url: Option<String>,
    pub goal_cents: i64,
    pub current_amount_cents: i64,
    pub donor_count: i64,
    pub progress_percent: i64,
    pub status: String,
    pub deadline: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Campaign> for CampaignResponse {
    fn from(campaign: Campaign) -> Self {
        Self {
            progress_percent: campaign.progress_percent(),
            id: campaign.id,
            creator_id: campaign.creator_id,
            title: campaign.title,
            description: campaign.description,
            category: campaign.category,
            image_url: campaign.image_url,
            goal_cents: campaign.goal_cents,
            current_amount_cents: campaign.current_amount_cents,
            donor_count: campaign.donor_count,
            status: campaign.status,
            deadline: campaign.deadline,
            created_at: campaign.created_at,
            updated_at: campaign.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn campaign(status: &str, deadline: Option<DateTime<Utc>>) -> Campaign {
        let now = Utc::now();
        Campaign {
            id: Uuid::new_v4(),
            creator_id: Uuid::new_v4(),
            title: "Garden".to_string(),
            description: String::new(),
            category: None,
            image_url: None,
            goal_cents: 10_000,
            current_amount_cents: 2_550,
            donor_count: 3,
            status: status.to_string(),
            deadline,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_active_campaign_without_deadline_accepts_donations() {
        assert!(campaign("active", None).accepts_donations(Utc::now()));
    }

    #[test]
    fn test_past_deadline_refuses_donations() {
        let now = Utc::now();
        let c = campaign("active", Some(now - Duration::hours(1)));
        assert!(!c.accepts_donations(now));
    }

    #[test]
    fn test_non_active_status_refuses_donations() {
        let now = Utc::now();
        assert!(!campaign("completed", None).accepts_donations(now));
        assert!(!campaign("cancelled", Some(now + Duration::days(1))).accepts_donations(now));
    }

    #[test]
    fn test_progress_is_floored_and_may_exceed_goal() {
        let mut c = campaign("active", None);
        assert_eq!(c.progress_percent(), 25);

        c.current_amount_cents = 25_000;
        assert_eq!(c.progress_percent(), 250);
    }

    #[test]
    fn test_status_parse() {
        assert_eq!("cancelled".parse(), Ok(CampaignStatus::Cancelled));
        assert!("paused".parse::<CampaignStatus>().is_err());
    }

    #[test]
    fn test_response_includes_progress() {
        let json = serde_json::to_value(CampaignResponse::from(campaign("active", None))).unwrap();
        assert_eq!(json["progress_percent"], 25);
        assert_eq!(json["status"], "active");
    }
}
