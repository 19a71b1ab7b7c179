//! Transaction (donation) data models and API request/response types.
//!
//! This module defines:
//! - `Transaction`: Database entity representing a donation to a campaign
//! - `DonationRequest`: Request body for donating
//! - `TransactionResponse`: Full view for the donor, creator, or an admin
//! - `DonationResponse`: Public view on a campaign page

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Represents a transaction record from the database.
///
/// # Database Table
///
/// Maps to the `transactions` table. Each transaction:
/// - Belongs to one campaign and one donor
/// - Stores amount in cents (never floats!)
/// - Is either `completed` or `refunded`
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Transaction {
    pub id: Uuid,
    pub campaign_id: Uuid,
    pub donor_id: Uuid,

    /// Amount in cents
    ///
    /// Must be positive (enforced by CHECK constraint)
    pub amount_cents: i64,

    pub message: Option<String>,

    /// Hide the donor in public listings
    pub is_anonymous: bool,

    /// `completed` or `refunded`
    pub status: String,

    /// Optional idempotency key, unique per donor
    ///
    /// If a donor sends the same key twice, the second request returns the
    /// original transaction instead of donating again.
    pub idempotency_key: Option<String>,

    pub created_at: DateTime<Utc>,
}

/// Lifecycle state of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Completed,
    Refunded,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Completed => "completed",
            TransactionStatus::Refunded => "refunded",
        }
    }
}

/// Request to donate to a campaign.
///
/// # JSON Example
///
/// ```json
/// {
///   "campaign_id": "550e8400-e29b-41d4-a716-446655440000",
///   "amount_cents": 2500,
///   "message": "Good luck!",
///   "is_anonymous": false,
///   "idempotency_key": "checkout-7f3a"
/// }
/// ```
#[derive(Debug, Deserialize)]
pub struct DonationRequest {
    pub campaign_id: Uuid,
    pub amount_cents: i64,
    pub message: Option<String>,

    #[serde(default)]
    pub is_anonymous: bool,

    pub idempotency_key: Option<String>,
}

/// Response returned for transaction operations.
///
/// ```json
/// {
///   "id": "770e8400-e29b-41d4-a716-446655440002",
///   "campaign_id": "550e8400-e29b-41d4-a716-446655440000",
///   "donor_id": "660e8400-e29b-41d4-a716-446655440001",
///   "amount_cents": 2500,
///   "message": "Good luck!",
///   "is_anonymous": false,
///   "status": "completed",
///   "created_at": "2025-12-21T16:00:00Z"
/// }
/// ```
#[derive(Debug, Serialize)]
pub struct TransactionResponse {
    pub id: Uuid,
    pub campaign_id: Uuid,
    pub donor_id: Uuid,
    pub amount_cents: i64,
    pub message: Option<String>,
    pub is_anonymous: bool,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

/// Convert database Transaction to API TransactionResponse.
///
/// The idempotency key is internal and is not echoed back.
impl From<Transaction> for TransactionResponse {
    fn from(transaction: Transaction) -> Self {
        Self {
            id: transaction.id,
            campaign_id: transaction.campaign_id,
            donor_id: transaction.donor_id,
            amount_cents: transaction.amount_cents,
            message: transaction.message,
            is_anonymous: transaction.is_anonymous,
            status: transaction.status,
            created_at: transaction.created_at,
        }
    }
}

/// Completed donation joined with the donor's display name.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DonationRow {
    pub id: Uuid,
    pub donor_id: Uuid,
    pub donor_name: String,
    pub amount_cents: i64,
    pub message: Option<String>,
    pub is_anonymous: bool,
    pub created_at: DateTime<Utc>,
}

/// Public view of a donation. Anonymous donations carry no donor identity.
#[derive(Debug, Serialize)]
pub struct DonationResponse {
    pub id: Uuid,
    pub donor_id: Option<Uuid>,
    pub donor_name: Option<String>,
    pub amount_cents: i64,
    pub message: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<DonationRow> for DonationResponse {
    fn from(row: DonationRow) -> Self {
        let (donor_id, donor_name) = if row.is_anonymous {
            (None, None)
        } else {
            (Some(row.donor_id), Some(row.donor_name))
        };

        Self {
            id: row.id,
            donor_id,
            donor_name,
            amount_cents: row.amount_cents,
            message: row.message,
            created_at: row.created_at,
        }
    }
}
