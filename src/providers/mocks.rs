use std::sync::Mutex;

use async_trait::async_trait;

use crate::auth::{Identity, IdentityVerifier};
use crate::models::ticket::Ticket;
use crate::providers::email::{Mailer, DELIVERY_FAILED};
use crate::providers::render::TicketRenderer;
use crate::utils::error::AppError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SentEmail {
    Otp { to: String, code: String },
    Ticket { to: String, pdf_bytes: usize },
}

/// Mailer double that records every send so tests can read codes back.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<SentEmail>>,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<SentEmail> {
        self.sent.lock().unwrap().clone()
    }

    pub fn last_otp(&self) -> Option<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find_map(|mail| match mail {
                SentEmail::Otp { code, .. } => Some(code.clone()),
                _ => None,
            })
    }

    pub fn otp_count(&self) -> usize {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|mail| matches!(mail, SentEmail::Otp { .. }))
            .count()
    }

    pub fn ticket_count(&self) -> usize {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|mail| matches!(mail, SentEmail::Ticket { .. }))
            .count()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send_otp(&self, ticket: &Ticket, code: &str) -> Result<(), AppError> {
        self.sent.lock().unwrap().push(SentEmail::Otp {
            to: ticket.holder_email.clone(),
            code: code.to_string(),
        });
        Ok(())
    }

    async fn send_ticket(&self, ticket: &Ticket, pdf: Vec<u8>) -> Result<(), AppError> {
        self.sent.lock().unwrap().push(SentEmail::Ticket {
            to: ticket.holder_email.clone(),
            pdf_bytes: pdf.len(),
        });
        Ok(())
    }
}

/// Mailer double that always fails, for exercising dispatch-failure paths.
pub struct FailingMailer;

#[async_trait]
impl Mailer for FailingMailer {
    async fn send_otp(&self, _ticket: &Ticket, _code: &str) -> Result<(), AppError> {
        Err(AppError::DependencyError(DELIVERY_FAILED.to_string()))
    }

    async fn send_ticket(&self, _ticket: &Ticket, _pdf: Vec<u8>) -> Result<(), AppError> {
        Err(AppError::DependencyError(DELIVERY_FAILED.to_string()))
    }
}

/// Renderer double producing tiny deterministic artifacts.
pub struct StubRenderer;

impl TicketRenderer for StubRenderer {
    fn qr_data_url(&self, payload: &str) -> Result<String, AppError> {
        Ok(format!("data:qr/{payload}"))
    }

    fn ticket_pdf(&self, _ticket: &Ticket) -> Result<Vec<u8>, AppError> {
        Ok(b"%PDF-1.4 stub".to_vec())
    }
}

/// Renderer double that always fails.
pub struct FailingRenderer;

impl TicketRenderer for FailingRenderer {
    fn qr_data_url(&self, _payload: &str) -> Result<String, AppError> {
        Err(AppError::DependencyError(
            "Failed to render ticket artifacts.".to_string(),
        ))
    }

    fn ticket_pdf(&self, _ticket: &Ticket) -> Result<Vec<u8>, AppError> {
        Err(AppError::DependencyError(
            "Failed to render ticket artifacts.".to_string(),
        ))
    }
}

/// Verifier double that accepts the literal token `"valid-token"` and maps it
/// to a fixed identity.
pub struct StaticVerifier {
    email: String,
}

impl StaticVerifier {
    pub fn admin() -> Self {
        Self::with_email("admin@example.com")
    }

    pub fn with_email(email: &str) -> Self {
        Self {
            email: email.to_string(),
        }
    }
}

#[async_trait]
impl IdentityVerifier for StaticVerifier {
    async fn verify(&self, token: &str) -> Result<Identity, AppError> {
        if token == "valid-token" {
            Ok(Identity {
                subject: "user_1".to_string(),
                email: self.email.clone(),
            })
        } else {
            Err(AppError::AuthError("Invalid or expired token.".to_string()))
        }
    }
}
