use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::models::ticket::{normalize_email, NewTicket, Ticket, TicketStatus};
use crate::store::{CheckInAttempt, TicketCounts, TicketStore};
use crate::utils::error::AppError;

/// In-memory ticket store backing the service tests. The single mutex around
/// the map gives check-in the same atomicity the conditional UPDATE gives the
/// Postgres store.
#[derive(Default)]
pub struct MemoryTicketStore {
    tickets: Mutex<HashMap<Uuid, Ticket>>,
}

impl MemoryTicketStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a ticket verbatim, bypassing uniqueness checks. Test fixtures
    /// only.
    pub fn seed(&self, ticket: Ticket) {
        self.tickets.lock().unwrap().insert(ticket.id, ticket);
    }
}

fn blank_ticket(new: NewTicket) -> Ticket {
    let now = Utc::now();
    Ticket {
        id: Uuid::new_v4(),
        holder_email: normalize_email(&new.holder_email),
        holder_name: new.holder_name,
        holder_phone: None,
        holder_gender: None,
        holder_dob: None,
        holder_referral_source: None,
        holder_referral_details: None,
        holder_buying_interest: None,
        holder_buying_interest_details: None,
        status: TicketStatus::Pending,
        is_email_verified: false,
        otp_code: None,
        otp_expiry: None,
        qr_token: None,
        is_checked_in: false,
        check_in_time: None,
        created_at: now,
        updated_at: now,
    }
}

#[async_trait]
impl TicketStore for MemoryTicketStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<Ticket>, AppError> {
        let wanted = normalize_email(email);
        let tickets = self.tickets.lock().unwrap();
        Ok(tickets
            .values()
            .find(|t| t.holder_email == wanted)
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Ticket>, AppError> {
        Ok(self.tickets.lock().unwrap().get(&id).cloned())
    }

    async fn find_by_qr_token(&self, qr_token: &str) -> Result<Option<Ticket>, AppError> {
        let tickets = self.tickets.lock().unwrap();
        Ok(tickets
            .values()
            .find(|t| t.qr_token.as_deref() == Some(qr_token))
            .cloned())
    }

    async fn create(&self, new: NewTicket) -> Result<Ticket, AppError> {
        let mut tickets = self.tickets.lock().unwrap();
        let email = normalize_email(&new.holder_email);
        if tickets.values().any(|t| t.holder_email == email) {
            return Err(AppError::Duplicate(
                "A ticket with these details already exists".to_string(),
            ));
        }
        let ticket = blank_ticket(new);
        tickets.insert(ticket.id, ticket.clone());
        Ok(ticket)
    }

    async fn save(&self, mut ticket: Ticket) -> Result<Ticket, AppError> {
        let mut tickets = self.tickets.lock().unwrap();
        if !tickets.contains_key(&ticket.id) {
            return Err(AppError::NotFound("Ticket no longer exists".to_string()));
        }
        ticket.holder_email = normalize_email(&ticket.holder_email);
        let conflict = tickets.values().any(|other| {
            other.id != ticket.id
                && (other.holder_email == ticket.holder_email
                    || (other.qr_token.is_some() && other.qr_token == ticket.qr_token))
        });
        if conflict {
            return Err(AppError::Duplicate(
                "A ticket with these details already exists".to_string(),
            ));
        }
        ticket.updated_at = Utc::now();
        tickets.insert(ticket.id, ticket.clone());
        Ok(ticket)
    }

    async fn check_in(&self, qr_token: &str) -> Result<CheckInAttempt, AppError> {
        let mut tickets = self.tickets.lock().unwrap();
        let found = tickets
            .values_mut()
            .find(|t| t.qr_token.as_deref() == Some(qr_token));
        match found {
            None => Ok(CheckInAttempt::NotFound),
            Some(t) if t.status != TicketStatus::Verified => {
                Ok(CheckInAttempt::NotVerified(t.clone()))
            }
            Some(t) if t.is_checked_in => Ok(CheckInAttempt::AlreadyCheckedIn(t.clone())),
            Some(t) => {
                t.is_checked_in = true;
                t.check_in_time = Some(Utc::now());
                t.updated_at = Utc::now();
                Ok(CheckInAttempt::CheckedIn(t.clone()))
            }
        }
    }

    async fn list_all(&self) -> Result<Vec<Ticket>, AppError> {
        let mut all: Vec<Ticket> = self.tickets.lock().unwrap().values().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(all)
    }

    async fn counts(&self) -> Result<TicketCounts, AppError> {
        let tickets = self.tickets.lock().unwrap();
        let mut counts = TicketCounts {
            total: 0,
            checked_in: 0,
            verified: 0,
            pending: 0,
            cancelled: 0,
        };
        for t in tickets.values() {
            counts.total += 1;
            if t.is_checked_in {
                counts.checked_in += 1;
            }
            match t.status {
                TicketStatus::Verified => counts.verified += 1,
                TicketStatus::Pending => counts.pending += 1,
                TicketStatus::Cancelled => counts.cancelled += 1,
            }
        }
        Ok(counts)
    }

    async fn recent_check_ins(&self, limit: i64) -> Result<Vec<Ticket>, AppError> {
        let mut checked: Vec<Ticket> = self
            .tickets
            .lock()
            .unwrap()
            .values()
            .filter(|t| t.is_checked_in)
            .cloned()
            .collect();
        checked.sort_by(|a, b| b.check_in_time.cmp(&a.check_in_time));
        checked.truncate(limit.max(0) as usize);
        Ok(checked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn verified_ticket(store: &MemoryTicketStore, email: &str, token: &str) -> Ticket {
        let mut ticket = store
            .create(NewTicket {
                holder_email: email.to_string(),
                holder_name: "Test Holder".to_string(),
            })
            .await
            .unwrap();
        ticket.status = TicketStatus::Verified;
        ticket.is_email_verified = true;
        ticket.qr_token = Some(token.to_string());
        store.save(ticket).await.unwrap()
    }

    #[tokio::test]
    async fn email_lookup_is_case_insensitive() {
        let store = MemoryTicketStore::new();
        store
            .create(NewTicket {
                holder_email: "Holder@Example.com".to_string(),
                holder_name: "Test Holder".to_string(),
            })
            .await
            .unwrap();

        let found = store.find_by_email("holder@EXAMPLE.COM").await.unwrap();
        assert!(found.is_some());
        assert_eq!(found.unwrap().holder_email, "holder@example.com");
    }

    #[tokio::test]
    async fn create_rejects_duplicate_email() {
        let store = MemoryTicketStore::new();
        let new = NewTicket {
            holder_email: "holder@example.com".to_string(),
            holder_name: "Test Holder".to_string(),
        };
        store.create(new.clone()).await.unwrap();

        let err = store.create(new).await.unwrap_err();
        assert!(matches!(err, AppError::Duplicate(_)));
    }

    #[tokio::test]
    async fn save_rejects_duplicate_qr_token() {
        let store = MemoryTicketStore::new();
        verified_ticket(&store, "first@example.com", "TOKEN-1").await;

        let mut second = store
            .create(NewTicket {
                holder_email: "second@example.com".to_string(),
                holder_name: "Test Holder".to_string(),
            })
            .await
            .unwrap();
        second.qr_token = Some("TOKEN-1".to_string());

        let err = store.save(second).await.unwrap_err();
        assert!(matches!(err, AppError::Duplicate(_)));
    }

    #[tokio::test]
    async fn check_in_transitions_each_state_once() {
        let store = MemoryTicketStore::new();
        verified_ticket(&store, "holder@example.com", "TOKEN-1").await;

        let first = store.check_in("TOKEN-1").await.unwrap();
        let ticket = match first {
            CheckInAttempt::CheckedIn(t) => t,
            other => panic!("expected CheckedIn, got {other:?}"),
        };
        assert!(ticket.is_checked_in);
        assert!(ticket.check_in_time.is_some());

        let second = store.check_in("TOKEN-1").await.unwrap();
        assert!(matches!(second, CheckInAttempt::AlreadyCheckedIn(_)));
    }

    #[tokio::test]
    async fn check_in_classifies_missing_and_unverified() {
        let store = MemoryTicketStore::new();
        assert!(matches!(
            store.check_in("NO-SUCH-TOKEN").await.unwrap(),
            CheckInAttempt::NotFound
        ));

        let mut pending = store
            .create(NewTicket {
                holder_email: "pending@example.com".to_string(),
                holder_name: "Test Holder".to_string(),
            })
            .await
            .unwrap();
        pending.qr_token = Some("PENDING-TOKEN".to_string());
        store.save(pending).await.unwrap();

        assert!(matches!(
            store.check_in("PENDING-TOKEN").await.unwrap(),
            CheckInAttempt::NotVerified(_)
        ));
    }

    #[tokio::test]
    async fn counts_track_status_and_check_ins() {
        let store = MemoryTicketStore::new();
        verified_ticket(&store, "a@example.com", "TOKEN-A").await;
        verified_ticket(&store, "b@example.com", "TOKEN-B").await;
        store
            .create(NewTicket {
                holder_email: "c@example.com".to_string(),
                holder_name: "Test Holder".to_string(),
            })
            .await
            .unwrap();
        store.check_in("TOKEN-A").await.unwrap();

        let counts = store.counts().await.unwrap();
        assert_eq!(counts.total, 3);
        assert_eq!(counts.verified, 2);
        assert_eq!(counts.pending, 1);
        assert_eq!(counts.checked_in, 1);
        assert_eq!(counts.cancelled, 0);
    }
}
