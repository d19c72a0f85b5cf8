use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use uuid::Uuid;

use crate::models::ticket::TicketStatus;
use crate::providers::render::TicketRenderer;
use crate::services::otp::{invalid_otp, OtpIssuer};
use crate::store::TicketStore;
use crate::utils::error::AppError;

/// Ticket view returned after a successful login, QR image included so the
/// holder can re-display their pass.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginTicket {
    pub id: Uuid,
    pub holder_name: String,
    pub holder_email: String,
    pub holder_phone: Option<String>,
    pub holder_gender: Option<String>,
    pub holder_dob: Option<NaiveDate>,
    pub status: TicketStatus,
    pub qr_code: String,
}

/// Passwordless login for attendees who already hold a verified ticket.
pub struct LoginService {
    store: Arc<dyn TicketStore>,
    otp: OtpIssuer,
    renderer: Arc<dyn TicketRenderer>,
}

impl LoginService {
    pub fn new(
        store: Arc<dyn TicketStore>,
        otp: OtpIssuer,
        renderer: Arc<dyn TicketRenderer>,
    ) -> Self {
        Self {
            store,
            otp,
            renderer,
        }
    }

    /// Emails a login code, but only to fully registered holders.
    pub async fn request_otp(&self, email: &str) -> Result<(), AppError> {
        match self.store.find_by_email(email).await? {
            Some(t) if t.status == TicketStatus::Verified => {
                self.otp.issue(email, None).await?;
                Ok(())
            }
            _ => Err(AppError::NotFound(
                "No registered ticket found for this email.".to_string(),
            )),
        }
    }

    /// Validates the login code, consumes it and returns the ticket with a
    /// freshly rendered QR. The ticket must still be verified at validation
    /// time.
    pub async fn verify_otp(&self, email: &str, code: &str) -> Result<LoginTicket, AppError> {
        let mut ticket = self.otp.validate(email, code).await?;
        if ticket.status != TicketStatus::Verified {
            return Err(invalid_otp());
        }
        ticket.otp_code = None;
        ticket.otp_expiry = None;
        let ticket = self.store.save(ticket).await?;

        let qr_code = self.renderer.qr_data_url(&ticket.qr_payload())?;
        Ok(LoginTicket {
            id: ticket.id,
            holder_name: ticket.holder_name,
            holder_email: ticket.holder_email,
            holder_phone: ticket.holder_phone,
            holder_gender: ticket.holder_gender,
            holder_dob: ticket.holder_dob,
            status: ticket.status,
            qr_code,
        })
    }
}
