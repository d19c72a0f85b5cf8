use std::env;

pub mod cors;
pub mod security;

pub use cors::create_cors_layer;
pub use security::create_security_headers_layer;

const DEFAULT_ALLOWED_ORIGINS: &str = "http://localhost:5173,http://localhost:5174";

/// Branding applied to outgoing email, ticket PDFs and QR payloads.
#[derive(Debug, Clone)]
pub struct EventProfile {
    pub name: String,
    pub qr_prefix: String,
}

/// SMTP relay settings. Absent when `SMTP_HOST` is unset, in which case
/// email delivery degrades to log-only output.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from: String,
}

pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
    pub is_production: bool,
    pub admin_emails: Vec<String>,
    pub admin_token_secret: String,
    pub smtp: Option<SmtpConfig>,
    pub event: EventProfile,
}

impl Config {
    pub fn from_env() -> Self {
        let is_production = env::var("RUST_ENV")
            .map(|v| v.to_lowercase() == "production")
            .unwrap_or(false);

        let smtp = env::var("SMTP_HOST").ok().map(|host| SmtpConfig {
            host,
            port: env::var("SMTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(587),
            username: env::var("SMTP_USERNAME").unwrap_or_default(),
            password: env::var("SMTP_PASSWORD").unwrap_or_default(),
            from: env::var("SMTP_FROM")
                .unwrap_or_else(|_| "Gatepass <no-reply@gatepass.events>".to_string()),
        });

        let admin_token_secret = env::var("ADMIN_TOKEN_SECRET").unwrap_or_else(|_| {
            tracing::warn!("ADMIN_TOKEN_SECRET not set, using an insecure development secret");
            "insecure-dev-secret".to_string()
        });

        Self {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgres://localhost/gatepass".to_string()),
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3001),
            cors_allowed_origins: split_csv(
                &env::var("CORS_ALLOWED_ORIGINS")
                    .unwrap_or_else(|_| DEFAULT_ALLOWED_ORIGINS.to_string()),
            ),
            is_production,
            admin_emails: split_csv(&env::var("ADMIN_EMAILS").unwrap_or_default()),
            admin_token_secret,
            smtp,
            event: EventProfile {
                name: env::var("EVENT_NAME").unwrap_or_else(|_| "Gatepass 2026".to_string()),
                qr_prefix: env::var("QR_PREFIX").unwrap_or_else(|_| "GATEPASS".to_string()),
            },
        }
    }

    /// A fully populated config for tests, independent of process env.
    #[cfg(test)]
    pub fn for_tests() -> Self {
        Self {
            database_url: "postgres://localhost/gatepass_test".to_string(),
            port: 3001,
            cors_allowed_origins: split_csv(DEFAULT_ALLOWED_ORIGINS),
            is_production: false,
            admin_emails: vec!["admin@example.com".to_string()],
            admin_token_secret: "test-secret".to_string(),
            smtp: None,
            event: EventProfile {
                name: "Gatepass 2026".to_string(),
                qr_prefix: "GATEPASS".to_string(),
            },
        }
    }
}

fn split_csv(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
