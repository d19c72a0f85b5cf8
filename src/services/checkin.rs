use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::models::ticket::{Ticket, TicketStatus};
use crate::store::{CheckInAttempt, TicketStore};
use crate::utils::error::AppError;

/// How many of the latest check-ins the dashboard shows.
const RECENT_CHECK_INS_LIMIT: i64 = 5;

/// Ticket view shown to the door scanner before committing a check-in.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScannedTicket {
    pub id: Uuid,
    pub qr_token: Option<String>,
    pub holder_name: String,
    pub holder_email: String,
    pub holder_phone: Option<String>,
    pub holder_gender: Option<String>,
    pub holder_dob: Option<NaiveDate>,
    pub is_checked_in: bool,
}

impl ScannedTicket {
    fn from_ticket(t: &Ticket) -> Self {
        Self {
            id: t.id,
            qr_token: t.qr_token.clone(),
            holder_name: t.holder_name.clone(),
            holder_email: t.holder_email.clone(),
            holder_phone: t.holder_phone.clone(),
            holder_gender: t.holder_gender.clone(),
            holder_dob: t.holder_dob,
            is_checked_in: t.is_checked_in,
        }
    }
}

/// Result of a committed check-in.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckInConfirmation {
    pub id: Uuid,
    pub holder_name: String,
    pub checked_in_at: Option<DateTime<Utc>>,
}

/// Full ticket row for the admin table, minus the OTP secrets.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketSummary {
    pub id: Uuid,
    pub holder_email: String,
    pub holder_name: String,
    pub holder_phone: Option<String>,
    pub holder_gender: Option<String>,
    pub holder_dob: Option<NaiveDate>,
    pub holder_referral_source: Option<String>,
    pub holder_referral_details: Option<String>,
    pub holder_buying_interest: Option<String>,
    pub holder_buying_interest_details: Option<String>,
    pub status: TicketStatus,
    pub is_email_verified: bool,
    pub qr_token: Option<String>,
    pub is_checked_in: bool,
    pub check_in_time: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TicketSummary {
    fn from_ticket(t: &Ticket) -> Self {
        Self {
            id: t.id,
            holder_email: t.holder_email.clone(),
            holder_name: t.holder_name.clone(),
            holder_phone: t.holder_phone.clone(),
            holder_gender: t.holder_gender.clone(),
            holder_dob: t.holder_dob,
            holder_referral_source: t.holder_referral_source.clone(),
            holder_referral_details: t.holder_referral_details.clone(),
            holder_buying_interest: t.holder_buying_interest.clone(),
            holder_buying_interest_details: t.holder_buying_interest_details.clone(),
            status: t.status,
            is_email_verified: t.is_email_verified,
            qr_token: t.qr_token.clone(),
            is_checked_in: t.is_checked_in,
            check_in_time: t.check_in_time,
            created_at: t.created_at,
            updated_at: t.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketList {
    pub count: usize,
    pub tickets: Vec<TicketSummary>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardMetrics {
    pub total_tickets: i64,
    pub checked_in: i64,
    pub verified: i64,
    pub pending: i64,
    pub cancelled: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentCheckIn {
    pub holder_name: String,
    pub holder_email: String,
    pub check_in_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub metrics: DashboardMetrics,
    pub recent_check_ins: Vec<RecentCheckIn>,
}

/// Door operations: scanning, admitting and the dashboard views behind them.
pub struct CheckInService {
    store: Arc<dyn TicketStore>,
}

impl CheckInService {
    pub fn new(store: Arc<dyn TicketStore>) -> Self {
        Self { store }
    }

    /// Dry-run check of a scanned code. Reports the holder without touching
    /// the ticket, so a rejected scan can still be retried.
    pub async fn validate(&self, qr_data: &str) -> Result<ScannedTicket, AppError> {
        let ticket = self
            .store
            .find_by_qr_token(qr_data)
            .await?
            .ok_or_else(not_found)?;
        if ticket.status != TicketStatus::Verified {
            return Err(not_checkable(ticket.status));
        }
        if ticket.is_checked_in {
            return Err(AppError::DuplicateCheckIn {
                holder_name: ticket.holder_name.clone(),
                checked_in_at: ticket.check_in_time,
            });
        }
        Ok(ScannedTicket::from_ticket(&ticket))
    }

    /// Commits the check-in. When several scanners race on the same code, at
    /// most one caller wins; the rest get the duplicate error with the
    /// winner's timestamp.
    pub async fn check_in(&self, qr_data: &str) -> Result<CheckInConfirmation, AppError> {
        match self.store.check_in(qr_data).await? {
            CheckInAttempt::CheckedIn(t) => Ok(CheckInConfirmation {
                id: t.id,
                holder_name: t.holder_name,
                checked_in_at: t.check_in_time,
            }),
            CheckInAttempt::AlreadyCheckedIn(t) => Err(AppError::DuplicateCheckIn {
                holder_name: t.holder_name,
                checked_in_at: t.check_in_time,
            }),
            CheckInAttempt::NotVerified(t) => Err(not_checkable(t.status)),
            CheckInAttempt::NotFound => Err(not_found()),
        }
    }

    pub async fn list_tickets(&self) -> Result<TicketList, AppError> {
        let tickets = self.store.list_all().await?;
        Ok(TicketList {
            count: tickets.len(),
            tickets: tickets.iter().map(TicketSummary::from_ticket).collect(),
        })
    }

    pub async fn dashboard_stats(&self) -> Result<DashboardStats, AppError> {
        let counts = self.store.counts().await?;
        let recents = self.store.recent_check_ins(RECENT_CHECK_INS_LIMIT).await?;
        Ok(DashboardStats {
            metrics: DashboardMetrics {
                total_tickets: counts.total,
                checked_in: counts.checked_in,
                verified: counts.verified,
                pending: counts.pending,
                cancelled: counts.cancelled,
            },
            recent_check_ins: recents
                .iter()
                .map(|t| RecentCheckIn {
                    holder_name: t.holder_name.clone(),
                    holder_email: t.holder_email.clone(),
                    check_in_time: t.check_in_time,
                })
                .collect(),
        })
    }
}

fn not_found() -> AppError {
    AppError::NotFound("Invalid ticket. Not found in system.".to_string())
}

fn not_checkable(status: TicketStatus) -> AppError {
    AppError::NotVerified(format!("Ticket status is {status}. Cannot check in."))
}
