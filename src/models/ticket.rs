use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Accepted values for the holder gender field.
pub const GENDERS: [&str; 3] = ["Male", "Female", "Other"];

/// Lifecycle state of a ticket. A ticket is created as `Pending`, becomes
/// `Verified` once registration completes, and never leaves `Verified`.
/// `Cancelled` is reserved for manual intervention directly in the database;
/// no API operation produces it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "ticket_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TicketStatus {
    Pending,
    Verified,
    Cancelled,
}

impl std::fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Pending => "pending",
            Self::Verified => "verified",
            Self::Cancelled => "cancelled",
        };
        f.write_str(label)
    }
}

/// One ticket per attendee email. The OTP fields are transient (cleared after
/// each successful validation) and are never serialized into API responses.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Ticket {
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
    #[serde(skip_serializing, default)]
    pub otp_code: Option<String>,
    #[serde(skip_serializing, default)]
    pub otp_expiry: Option<DateTime<Utc>>,
    pub qr_token: Option<String>,
    pub is_checked_in: bool,
    pub check_in_time: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Ticket {
    /// Payload encoded into QR artifacts. Falls back to the ticket id for
    /// rows that have not been assigned a token yet.
    pub fn qr_payload(&self) -> String {
        self.qr_token
            .clone()
            .unwrap_or_else(|| self.id.to_string())
    }

    /// Short human-readable reference derived from the ticket id, shown in
    /// email bodies and printed on the ticket PDF.
    pub fn short_ref(&self) -> String {
        let simple = self.id.simple().to_string().to_uppercase();
        simple[simple.len() - 8..].to_string()
    }
}

/// Fields required to open a brand-new pending ticket.
#[derive(Debug, Clone)]
pub struct NewTicket {
    pub holder_email: String,
    pub holder_name: String,
}

/// Canonical form for holder emails: trimmed and lowercased. Every lookup
/// and write goes through this so that uniqueness is case-insensitive.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
