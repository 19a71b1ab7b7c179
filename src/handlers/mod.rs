//! HTTP request handlers (route handlers).
//!
//! Each handler is an async function that:
//! 1. Receives HTTP request data (JSON body, URL params, etc.)
//! 2. Calls into services or runs a direct query
//! 3. Returns HTTP response (JSON, status code)

/// Reconciliation endpoints for admins
pub mod admin;
/// Registration, login, current user
pub mod auth;
/// Campaign CRUD and donation listing
pub mod campaigns;
/// Liveness and database connectivity
pub mod health;
/// Donations and refunds
pub mod transactions;
/// Profiles
pub mod users;
