use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::ticket::{normalize_email, NewTicket, Ticket, TicketStatus};
use crate::store::{CheckInAttempt, TicketCounts, TicketStore};
use crate::utils::error::AppError;

/// Postgres-backed ticket store. Uniqueness of `holder_email` and `qr_token`
/// is enforced by the schema, so concurrent writers are arbitrated by the
/// database rather than by in-process locks.
pub struct PgTicketStore {
    pool: PgPool,
}

impl PgTicketStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn map_unique_violation(err: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return AppError::Duplicate(
                "A ticket with these details already exists".to_string(),
            );
        }
    }
    AppError::DatabaseError(err)
}

#[async_trait]
impl TicketStore for PgTicketStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<Ticket>, AppError> {
        let ticket = sqlx::query_as::<_, Ticket>(
            "SELECT * FROM tickets WHERE holder_email = $1",
        )
        .bind(normalize_email(email))
        .fetch_optional(&self.pool)
        .await?;
        Ok(ticket)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Ticket>, AppError> {
        let ticket = sqlx::query_as::<_, Ticket>("SELECT * FROM tickets WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(ticket)
    }

    async fn find_by_qr_token(&self, qr_token: &str) -> Result<Option<Ticket>, AppError> {
        let ticket = sqlx::query_as::<_, Ticket>(
            "SELECT * FROM tickets WHERE qr_token = $1",
        )
        .bind(qr_token)
        .fetch_optional(&self.pool)
        .await?;
        Ok(ticket)
    }

    async fn create(&self, new: NewTicket) -> Result<Ticket, AppError> {
        let ticket = sqlx::query_as::<_, Ticket>(
            r#"
            INSERT INTO tickets (id, holder_email, holder_name)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(normalize_email(&new.holder_email))
        .bind(&new.holder_name)
        .fetch_one(&self.pool)
        .await
        .map_err(map_unique_violation)?;
        Ok(ticket)
    }

    async fn save(&self, ticket: Ticket) -> Result<Ticket, AppError> {
        let saved = sqlx::query_as::<_, Ticket>(
            r#"
            UPDATE tickets SET
                holder_email = $2,
                holder_name = $3,
                holder_phone = $4,
                holder_gender = $5,
                holder_dob = $6,
                holder_referral_source = $7,
                holder_referral_details = $8,
                holder_buying_interest = $9,
                holder_buying_interest_details = $10,
                status = $11,
                is_email_verified = $12,
                otp_code = $13,
                otp_expiry = $14,
                qr_token = $15,
                is_checked_in = $16,
                check_in_time = $17,
                updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(ticket.id)
        .bind(normalize_email(&ticket.holder_email))
        .bind(&ticket.holder_name)
        .bind(&ticket.holder_phone)
        .bind(&ticket.holder_gender)
        .bind(ticket.holder_dob)
        .bind(&ticket.holder_referral_source)
        .bind(&ticket.holder_referral_details)
        .bind(&ticket.holder_buying_interest)
        .bind(&ticket.holder_buying_interest_details)
        .bind(ticket.status)
        .bind(ticket.is_email_verified)
        .bind(&ticket.otp_code)
        .bind(ticket.otp_expiry)
        .bind(&ticket.qr_token)
        .bind(ticket.is_checked_in)
        .bind(ticket.check_in_time)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_unique_violation)?;

        saved.ok_or_else(|| AppError::NotFound("Ticket no longer exists".to_string()))
    }

    async fn check_in(&self, qr_token: &str) -> Result<CheckInAttempt, AppError> {
        loop {
            // Single conditional update: at most one concurrent caller can
            // match the `is_checked_in = FALSE` predicate.
            let winner = sqlx::query_as::<_, Ticket>(
                r#"
                UPDATE tickets
                SET is_checked_in = TRUE, check_in_time = now(), updated_at = now()
                WHERE qr_token = $1 AND status = 'verified' AND is_checked_in = FALSE
                RETURNING *
                "#,
            )
            .bind(qr_token)
            .fetch_optional(&self.pool)
            .await?;

            if let Some(ticket) = winner {
                return Ok(CheckInAttempt::CheckedIn(ticket));
            }

            // The update matched nothing; read the row back to classify why.
            match self.find_by_qr_token(qr_token).await? {
                None => return Ok(CheckInAttempt::NotFound),
                Some(t) if t.status != TicketStatus::Verified => {
                    return Ok(CheckInAttempt::NotVerified(t));
                }
                Some(t) if t.is_checked_in => {
                    return Ok(CheckInAttempt::AlreadyCheckedIn(t));
                }
                // The row became eligible between the two statements, e.g. a
                // registration completed concurrently. Take another pass.
                Some(_) => continue,
            }
        }
    }

    async fn list_all(&self) -> Result<Vec<Ticket>, AppError> {
        let tickets = sqlx::query_as::<_, Ticket>(
            "SELECT * FROM tickets ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(tickets)
    }

    async fn counts(&self) -> Result<TicketCounts, AppError> {
        let counts = sqlx::query_as::<_, TicketCounts>(
            r#"
            SELECT
                COUNT(*) AS total,
                COUNT(*) FILTER (WHERE is_checked_in) AS checked_in,
                COUNT(*) FILTER (WHERE status = 'verified') AS verified,
                COUNT(*) FILTER (WHERE status = 'pending') AS pending,
                COUNT(*) FILTER (WHERE status = 'cancelled') AS cancelled
            FROM tickets
            "#,
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(counts)
    }

    async fn recent_check_ins(&self, limit: i64) -> Result<Vec<Ticket>, AppError> {
        let tickets = sqlx::query_as::<_, Ticket>(
            r#"
            SELECT * FROM tickets
            WHERE is_checked_in = TRUE
            ORDER BY check_in_time DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(tickets)
    }
}
