use std::sync::Arc;

use chrono::{Duration, Utc};
use rand::Rng;

use crate::models::ticket::{NewTicket, Ticket};
use crate::providers::email::Mailer;
use crate::store::TicketStore;
use crate::utils::error::AppError;

/// Name recorded for holders who start verification without providing one.
pub const DEFAULT_HOLDER_NAME: &str = "Attendee";

const OTP_TTL_MINUTES: i64 = 10;

/// Uniform error for every OTP failure shape, so callers cannot probe
/// whether the email, the code or the expiry was wrong.
pub fn invalid_otp() -> AppError {
    AppError::InvalidOtp("Invalid or expired OTP.".to_string())
}

/// Issues and validates the 6-digit email codes used by both registration
/// and login. Codes are single-use: callers clear them from the ticket right
/// after a successful validation.
#[derive(Clone)]
pub struct OtpIssuer {
    store: Arc<dyn TicketStore>,
    mailer: Arc<dyn Mailer>,
}

impl OtpIssuer {
    pub fn new(store: Arc<dyn TicketStore>, mailer: Arc<dyn Mailer>) -> Self {
        Self { store, mailer }
    }

    fn generate_code() -> String {
        rand::thread_rng().gen_range(100_000..=999_999).to_string()
    }

    /// Stamps a fresh code and expiry on the holder's ticket, creating a
    /// pending row if none exists yet, then emails the code. A newly issued
    /// code always replaces the previous one.
    pub async fn issue(&self, email: &str, name: Option<&str>) -> Result<Ticket, AppError> {
        let mut ticket = match self.store.find_by_email(email).await? {
            Some(t) => t,
            None => self.create_pending(email, name).await?,
        };

        let code = Self::generate_code();
        ticket.otp_code = Some(code.clone());
        ticket.otp_expiry = Some(Utc::now() + Duration::minutes(OTP_TTL_MINUTES));
        let ticket = self.store.save(ticket).await?;

        if let Err(err) = self.mailer.send_otp(&ticket, &code).await {
            return Err(match err {
                AppError::DependencyError(_) => {
                    AppError::DependencyError("Failed to send OTP.".to_string())
                }
                other => other,
            });
        }
        Ok(ticket)
    }

    async fn create_pending(&self, email: &str, name: Option<&str>) -> Result<Ticket, AppError> {
        let new = NewTicket {
            holder_email: email.to_string(),
            holder_name: display_name(name),
        };
        match self.store.create(new).await {
            Ok(t) => Ok(t),
            // Lost an insert race; the row exists now, so load it.
            Err(AppError::Duplicate(_)) => {
                self.store.find_by_email(email).await?.ok_or_else(|| {
                    AppError::DependencyError("Could not start verification. Try again.".to_string())
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Returns the ticket when `code` matches the stored, unexpired code for
    /// `email`.
    pub async fn validate(&self, email: &str, code: &str) -> Result<Ticket, AppError> {
        let ticket = match self.store.find_by_email(email).await? {
            Some(t) => t,
            None => return Err(invalid_otp()),
        };

        let code_matches = ticket.otp_code.as_deref() == Some(code);
        let still_valid = ticket.otp_expiry.map_or(false, |expiry| expiry > Utc::now());
        if !code_matches || !still_valid {
            return Err(invalid_otp());
        }
        Ok(ticket)
    }
}

pub fn display_name(name: Option<&str>) -> String {
    match name.map(str::trim) {
        Some(n) if !n.is_empty() => n.to_string(),
        _ => DEFAULT_HOLDER_NAME.to_string(),
    }
}
