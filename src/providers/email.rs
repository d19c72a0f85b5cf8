use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::config::{EventProfile, SmtpConfig};
use crate::models::ticket::Ticket;
use crate::utils::error::AppError;

/// Public failure message for any delivery problem. Callers re-map it to an
/// operation-specific message; SMTP details only go to the logs.
pub const DELIVERY_FAILED: &str = "Email delivery failed.";

/// Outbound email seam. Production uses [`SmtpMailer`]; deployments without
/// SMTP credentials fall back to [`LogMailer`].
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Sends a one-time verification code to the ticket holder.
    async fn send_otp(&self, ticket: &Ticket, code: &str) -> Result<(), AppError>;

    /// Sends the entry pass email with the rendered PDF attached.
    async fn send_ticket(&self, ticket: &Ticket, pdf: Vec<u8>) -> Result<(), AppError>;
}

/// Delivers mail through an SMTP relay over TLS.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    event: EventProfile,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig, event: EventProfile) -> Result<Self, AppError> {
        // Port 465 relays speak TLS from the first byte; everything else is
        // assumed to upgrade via STARTTLS.
        let builder = if config.port == 465 {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
        }
        .map_err(|e| {
            AppError::DependencyError(format!("Invalid SMTP relay configuration: {e}"))
        })?
        .port(config.port);

        let builder = if config.username.is_empty() {
            builder
        } else {
            builder.credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
        };

        let from = config.from.parse::<Mailbox>().map_err(|e| {
            AppError::DependencyError(format!("Invalid SMTP from address: {e}"))
        })?;

        Ok(Self {
            transport: builder.build(),
            from,
            event,
        })
    }

    fn recipient(&self, ticket: &Ticket) -> Result<Mailbox, AppError> {
        let address = ticket.holder_email.parse::<Address>().map_err(|e| {
            tracing::error!(error = %e, "Recipient address rejected by mail builder");
            AppError::DependencyError(DELIVERY_FAILED.to_string())
        })?;
        Ok(Mailbox::new(Some(ticket.holder_name.clone()), address))
    }

    async fn deliver(&self, message: Message) -> Result<(), AppError> {
        self.transport.send(message).await.map_err(|e| {
            tracing::error!(error = %e, "SMTP delivery failed");
            AppError::DependencyError(DELIVERY_FAILED.to_string())
        })?;
        Ok(())
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send_otp(&self, ticket: &Ticket, code: &str) -> Result<(), AppError> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(self.recipient(ticket)?)
            .subject("Your verification code")
            .header(ContentType::TEXT_HTML)
            .body(otp_email_html(&self.event.name, &ticket.holder_name, code))
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to build OTP email");
                AppError::DependencyError(DELIVERY_FAILED.to_string())
            })?;

        self.deliver(message).await
    }

    async fn send_ticket(&self, ticket: &Ticket, pdf: Vec<u8>) -> Result<(), AppError> {
        let pdf_type = ContentType::parse("application/pdf").map_err(|e| {
            tracing::error!(error = %e, "Failed to build ticket attachment");
            AppError::DependencyError(DELIVERY_FAILED.to_string())
        })?;
        let attachment = Attachment::new(attachment_filename(ticket)).body(pdf, pdf_type);

        let message = Message::builder()
            .from(self.from.clone())
            .to(self.recipient(ticket)?)
            .subject(format!("Your {} entry pass", self.event.name))
            .multipart(
                MultiPart::mixed()
                    .singlepart(SinglePart::html(ticket_email_html(
                        &self.event.name,
                        &ticket.holder_name,
                        &ticket.short_ref(),
                    )))
                    .singlepart(attachment),
            )
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to build ticket email");
                AppError::DependencyError(DELIVERY_FAILED.to_string())
            })?;

        self.deliver(message).await
    }
}

/// Fallback mailer for environments without SMTP credentials. Emails are
/// logged instead of sent so the registration flow stays usable in
/// development.
pub struct LogMailer {
    event: EventProfile,
}

impl LogMailer {
    pub fn new(event: EventProfile) -> Self {
        Self { event }
    }
}

#[async_trait]
impl Mailer for LogMailer {
    async fn send_otp(&self, ticket: &Ticket, code: &str) -> Result<(), AppError> {
        tracing::info!(
            to = %ticket.holder_email,
            event = %self.event.name,
            "SMTP disabled, OTP email not sent"
        );
        tracing::debug!(code = %code, "OTP code for manual delivery");
        Ok(())
    }

    async fn send_ticket(&self, ticket: &Ticket, pdf: Vec<u8>) -> Result<(), AppError> {
        tracing::info!(
            to = %ticket.holder_email,
            event = %self.event.name,
            pdf_bytes = pdf.len(),
            "SMTP disabled, ticket email not sent"
        );
        Ok(())
    }
}

/// `Ticket-<last 6 of id>.pdf`, shared by the email attachment and the
/// download endpoint.
pub fn attachment_filename(ticket: &Ticket) -> String {
    let simple = ticket.id.simple().to_string();
    format!("Ticket-{}.pdf", &simple[simple.len() - 6..])
}

fn otp_email_html(event_name: &str, holder_name: &str, code: &str) -> String {
    format!(
        r#"<div style="font-family: Arial, sans-serif; max-width: 520px; margin: 0 auto;">
  <h2 style="color: #1a1a2e;">{event_name}</h2>
  <p>Hello {holder_name},</p>
  <p>Your verification code is:</p>
  <p style="font-size: 32px; font-weight: bold; letter-spacing: 8px; color: #1a1a2e;">{code}</p>
  <p>The code expires in 10 minutes. If you did not request it, you can ignore this email.</p>
</div>"#
    )
}

fn ticket_email_html(event_name: &str, holder_name: &str, ticket_ref: &str) -> String {
    format!(
        r#"<div style="font-family: Arial, sans-serif; max-width: 520px; margin: 0 auto;">
  <h2 style="color: #1a1a2e;">{event_name}</h2>
  <p>Hello {holder_name},</p>
  <p>Your registration is complete. Your entry pass <strong>#{ticket_ref}</strong> is attached as a PDF.</p>
  <p>Present the QR code on the pass at the entrance. Keep this email safe.</p>
</div>"#
    )
}
