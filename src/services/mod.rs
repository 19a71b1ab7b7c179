//! Business logic services.
//!
//! Services contain core business logic separated from HTTP handlers.
//! They handle database transactions, validation, and multi-step operations.

pub mod auth_service;
pub mod campaign_service;
pub mod reconciliation_service;
pub mod transaction_service;
