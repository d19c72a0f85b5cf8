use async_trait::async_trait;
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::ticket::{NewTicket, Ticket};
use crate::utils::error::AppError;

pub mod postgres;

#[cfg(test)]
pub mod memory;

/// Outcome of an atomic check-in attempt. Exactly one caller per ticket ever
/// receives `CheckedIn`; concurrent losers observe one of the other arms.
#[derive(Debug)]
pub enum CheckInAttempt {
    CheckedIn(Ticket),
    AlreadyCheckedIn(Ticket),
    NotVerified(Ticket),
    NotFound,
}

/// Aggregate counts backing the admin dashboard.
#[derive(Debug, Clone, Copy, FromRow)]
pub struct TicketCounts {
    pub total: i64,
    pub checked_in: i64,
    pub verified: i64,
    pub pending: i64,
    pub cancelled: i64,
}

/// Persistence seam for tickets. Handlers and services only ever see this
/// trait, so tests can swap in the in-memory implementation.
///
/// Email lookups are case-insensitive: implementations normalize the address
/// before matching. `create` and `save` surface uniqueness conflicts on
/// `holder_email` and `qr_token` as [`AppError::Duplicate`].
#[async_trait]
pub trait TicketStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<Ticket>, AppError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Ticket>, AppError>;

    async fn find_by_qr_token(&self, qr_token: &str) -> Result<Option<Ticket>, AppError>;

    /// Opens a fresh pending ticket with server-assigned id and timestamps.
    async fn create(&self, new: NewTicket) -> Result<Ticket, AppError>;

    /// Persists the given snapshot and returns the stored row with its
    /// refreshed `updated_at`.
    async fn save(&self, ticket: Ticket) -> Result<Ticket, AppError>;

    /// Marks the ticket behind `qr_token` as checked in, but only if it is
    /// verified and not already checked in. The read-check-write happens
    /// atomically with respect to concurrent calls for the same token.
    async fn check_in(&self, qr_token: &str) -> Result<CheckInAttempt, AppError>;

    /// All tickets, newest first.
    async fn list_all(&self) -> Result<Vec<Ticket>, AppError>;

    async fn counts(&self) -> Result<TicketCounts, AppError>;

    /// Most recently checked-in tickets, newest first.
    async fn recent_check_ins(&self, limit: i64) -> Result<Vec<Ticket>, AppError>;
}
