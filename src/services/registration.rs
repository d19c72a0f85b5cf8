use std::sync::Arc;

use chrono::NaiveDate;
use rand::RngCore;
use serde::Serialize;
use uuid::Uuid;

use crate::config::EventProfile;
use crate::models::ticket::{Ticket, TicketStatus};
use crate::providers::email::Mailer;
use crate::providers::render::TicketRenderer;
use crate::services::otp::OtpIssuer;
use crate::store::TicketStore;
use crate::utils::error::AppError;

/// Attendee details captured on the final registration step.
#[derive(Debug, Clone)]
pub struct CompletedProfile {
    pub name: String,
    pub phone: String,
    pub gender: String,
    pub dob: NaiveDate,
    pub referral_source: Option<String>,
    pub referral_details: Option<String>,
    pub buying_interest: Option<String>,
    pub buying_interest_details: Option<String>,
}

/// Slice of the ticket returned from `complete`. The QR token itself only
/// travels by email and through login.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedTicket {
    pub id: Uuid,
    pub holder_name: String,
    pub holder_email: String,
    pub status: TicketStatus,
}

/// Drives the three-step registration flow: initiate, verify email,
/// complete.
pub struct RegistrationService {
    store: Arc<dyn TicketStore>,
    otp: OtpIssuer,
    mailer: Arc<dyn Mailer>,
    renderer: Arc<dyn TicketRenderer>,
    event: EventProfile,
}

impl RegistrationService {
    pub fn new(
        store: Arc<dyn TicketStore>,
        otp: OtpIssuer,
        mailer: Arc<dyn Mailer>,
        renderer: Arc<dyn TicketRenderer>,
        event: EventProfile,
    ) -> Self {
        Self {
            store,
            otp,
            mailer,
            renderer,
            event,
        }
    }

    /// Starts (or restarts) email verification. Restarting invalidates any
    /// earlier confirmation so a hijacked pending row cannot skip the code.
    pub async fn initiate(&self, email: &str, name: Option<&str>) -> Result<(), AppError> {
        if let Some(mut ticket) = self.store.find_by_email(email).await? {
            if ticket.status == TicketStatus::Verified {
                return Err(AppError::AlreadyRegistered(
                    "This email is already registered.".to_string(),
                ));
            }
            if let Some(name) = name.map(str::trim).filter(|n| !n.is_empty()) {
                ticket.holder_name = name.to_string();
            }
            ticket.is_email_verified = false;
            ticket.status = TicketStatus::Pending;
            self.store.save(ticket).await?;
        }
        self.otp.issue(email, name).await?;
        Ok(())
    }

    /// Confirms ownership of the email address and consumes the code.
    pub async fn verify_email(&self, email: &str, code: &str) -> Result<(), AppError> {
        let mut ticket = self.otp.validate(email, code).await?;
        ticket.is_email_verified = true;
        ticket.otp_code = None;
        ticket.otp_expiry = None;
        self.store.save(ticket).await?;
        Ok(())
    }

    /// Finalizes registration: stores the profile, mints the QR token, flips
    /// the ticket to verified and emails the entry pass. The ticket is
    /// persisted before dispatch, so a delivery failure leaves it valid.
    pub async fn complete(
        &self,
        email: &str,
        profile: CompletedProfile,
    ) -> Result<CompletedTicket, AppError> {
        let mut ticket = self.store.find_by_email(email).await?.ok_or_else(|| {
            AppError::NotFound("No registration found for this email.".to_string())
        })?;
        if ticket.status == TicketStatus::Verified {
            return Err(AppError::AlreadyRegistered(
                "This email has already completed registration.".to_string(),
            ));
        }
        if !ticket.is_email_verified {
            return Err(AppError::NotVerified(
                "Email has not been verified.".to_string(),
            ));
        }

        ticket.holder_name = profile.name;
        ticket.holder_phone = Some(profile.phone);
        ticket.holder_gender = Some(profile.gender);
        ticket.holder_dob = Some(profile.dob);
        ticket.holder_referral_source = profile.referral_source;
        ticket.holder_referral_details = profile.referral_details;
        ticket.holder_buying_interest = profile.buying_interest;
        ticket.holder_buying_interest_details = profile.buying_interest_details;
        ticket.qr_token = Some(self.mint_qr_token(ticket.id));
        ticket.status = TicketStatus::Verified;
        let ticket = self.store.save(ticket).await?;

        let summary = CompletedTicket {
            id: ticket.id,
            holder_name: ticket.holder_name.clone(),
            holder_email: ticket.holder_email.clone(),
            status: ticket.status,
        };

        if let Err(err) = self.dispatch_entry_pass(&ticket).await {
            return Err(match err {
                AppError::DependencyError(_) => AppError::DependencyError(
                    "Your ticket was issued, but the confirmation email could not be delivered."
                        .to_string(),
                ),
                other => other,
            });
        }

        Ok(summary)
    }

    async fn dispatch_entry_pass(&self, ticket: &Ticket) -> Result<(), AppError> {
        let pdf = self.renderer.ticket_pdf(ticket)?;
        self.mailer.send_ticket(ticket, pdf).await
    }

    /// `<PREFIX>-<ticket id>-<16 hex chars>`: unguessable thanks to the
    /// random suffix, unique thanks to the embedded id.
    fn mint_qr_token(&self, id: Uuid) -> String {
        let mut suffix = [0u8; 8];
        rand::thread_rng().fill_bytes(&mut suffix);
        format!("{}-{}-{}", self.event.qr_prefix, id, hex::encode(suffix))
    }

    /// Resends a registration code. Only meaningful while the ticket is
    /// still pending.
    pub async fn resend(&self, email: &str) -> Result<(), AppError> {
        match self.store.find_by_email(email).await? {
            Some(t) if t.status == TicketStatus::Pending => {
                self.otp.issue(email, None).await?;
                Ok(())
            }
            _ => Err(AppError::NotFound(
                "No pending registration found for this email.".to_string(),
            )),
        }
    }

    /// Whether this email belongs to a fully registered ticket.
    pub async fn email_status(&self, email: &str) -> Result<bool, AppError> {
        let ticket = self.store.find_by_email(email).await?;
        Ok(matches!(ticket, Some(t) if t.status == TicketStatus::Verified))
    }
}
