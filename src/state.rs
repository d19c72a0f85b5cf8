use std::sync::Arc;

use crate::auth::{AdminPolicy, IdentityVerifier};
use crate::config::Config;
use crate::providers::email::Mailer;
use crate::providers::render::TicketRenderer;
use crate::services::checkin::CheckInService;
use crate::services::login::LoginService;
use crate::services::otp::OtpIssuer;
use crate::services::registration::RegistrationService;
use crate::services::tickets::TicketService;
use crate::store::TicketStore;

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub registration: Arc<RegistrationService>,
    pub login: Arc<LoginService>,
    pub checkin: Arc<CheckInService>,
    pub tickets: Arc<TicketService>,
    pub verifier: Arc<dyn IdentityVerifier>,
    pub admin_policy: Arc<AdminPolicy>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn TicketStore>,
        mailer: Arc<dyn Mailer>,
        renderer: Arc<dyn TicketRenderer>,
        verifier: Arc<dyn IdentityVerifier>,
        config: &Config,
    ) -> Self {
        let otp = OtpIssuer::new(store.clone(), mailer.clone());
        let registration = Arc::new(RegistrationService::new(
            store.clone(),
            otp.clone(),
            mailer.clone(),
            renderer.clone(),
            config.event.clone(),
        ));
        let login = Arc::new(LoginService::new(store.clone(), otp, renderer.clone()));
        let checkin = Arc::new(CheckInService::new(store.clone()));
        let tickets = Arc::new(TicketService::new(store, mailer, renderer));
        let admin_policy = Arc::new(AdminPolicy::from_emails(&config.admin_emails));
        Self {
            registration,
            login,
            checkin,
            tickets,
            verifier,
            admin_policy,
        }
    }
}
