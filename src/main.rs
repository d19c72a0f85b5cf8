use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use dotenvy::dotenv;
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;

use gatepass_server::auth::JwtVerifier;
use gatepass_server::config::Config;
use gatepass_server::providers::email::{LogMailer, Mailer, SmtpMailer};
use gatepass_server::providers::render::ArtifactRenderer;
use gatepass_server::routes::create_routes;
use gatepass_server::state::AppState;
use gatepass_server::store::postgres::PgTicketStore;

#[tokio::main]
async fn main() {
    dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = Config::from_env();

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await
        .expect("Failed to connect to database");

    tracing::info!("Successfully connected to database");

    sqlx::migrate!()
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    tracing::info!("Migrations run successfully");

    let store = Arc::new(PgTicketStore::new(pool));
    let mailer: Arc<dyn Mailer> = match &config.smtp {
        Some(smtp) => Arc::new(
            SmtpMailer::new(smtp, config.event.clone()).expect("Invalid SMTP configuration"),
        ),
        None => {
            tracing::warn!("SMTP not configured, emails will be logged instead of sent");
            Arc::new(LogMailer::new(config.event.clone()))
        }
    };
    let renderer = Arc::new(ArtifactRenderer::new(config.event.clone()));
    let verifier = Arc::new(JwtVerifier::new(&config.admin_token_secret));

    let state = AppState::new(store, mailer, renderer, verifier, &config);
    let app: Router = create_routes(state, &config);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("🚀 Server running at http://{}", addr);

    let listener = TcpListener::bind(addr)
        .await
        .expect("Failed to bind address");

    axum::serve(listener, app).await.expect("Server failed");
}
