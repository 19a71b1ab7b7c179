//! Data models representing database entities.
//!
//! This module contains all data structures that map to database tables,
//! plus the request and response bodies built from them.

/// Registered users and roles
pub mod user;
/// Fundraising campaigns
pub mod campaign;
/// Donations and refunds
pub mod transaction;
/// Page/offset list parameters
pub mod pagination;
