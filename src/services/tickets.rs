use std::sync::Arc;

use uuid::Uuid;

use crate::models::ticket::Ticket;
use crate::providers::email::{attachment_filename, Mailer};
use crate::providers::render::TicketRenderer;
use crate::store::TicketStore;
use crate::utils::error::AppError;

/// On-demand delivery of an already-issued ticket: PDF download and email
/// re-send.
pub struct TicketService {
    store: Arc<dyn TicketStore>,
    mailer: Arc<dyn Mailer>,
    renderer: Arc<dyn TicketRenderer>,
}

impl TicketService {
    pub fn new(
        store: Arc<dyn TicketStore>,
        mailer: Arc<dyn Mailer>,
        renderer: Arc<dyn TicketRenderer>,
    ) -> Self {
        Self {
            store,
            mailer,
            renderer,
        }
    }

    /// Renders the entry pass PDF for download, returning the suggested
    /// filename along with the bytes.
    pub async fn entry_pass_pdf(&self, id: Uuid) -> Result<(String, Vec<u8>), AppError> {
        let ticket = self.find(id).await?;
        let pdf = self.renderer.ticket_pdf(&ticket)?;
        Ok((attachment_filename(&ticket), pdf))
    }

    /// Re-sends the entry pass to the holder's email.
    pub async fn email_entry_pass(&self, id: Uuid) -> Result<(), AppError> {
        let ticket = self.find(id).await?;
        let pdf = self.renderer.ticket_pdf(&ticket)?;
        self.mailer.send_ticket(&ticket, pdf).await.map_err(|err| {
            tracing::error!("Failed to email ticket {}: {}", ticket.id, err);
            match err {
                AppError::DependencyError(_) => {
                    AppError::DependencyError("Failed to send ticket email.".to_string())
                }
                other => other,
            }
        })
    }

    async fn find(&self, id: Uuid) -> Result<Ticket, AppError> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Ticket not found.".to_string()))
    }
}
