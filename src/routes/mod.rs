use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::config::{create_cors_layer, create_security_headers_layer, Config};
use crate::handlers::{admin, health_check, user};
use crate::state::AppState;

pub fn create_routes(state: AppState, config: &Config) -> Router {
    let user_routes = Router::new()
        .route("/initiate-verification", post(user::initiate_verification))
        .route("/verify-otp", post(user::verify_otp))
        .route("/complete-registration", post(user::complete_registration))
        .route("/resend-otp", post(user::resend_otp))
        .route("/check-email", post(user::check_email))
        .route("/send-login-otp", post(user::send_login_otp))
        .route("/verify-login-otp", post(user::verify_login_otp))
        .route("/ticket/:id/download", get(user::download_ticket))
        .route("/ticket/:id/email", post(user::email_ticket));

    let admin_routes = Router::new()
        .route("/validate-ticket", post(admin::validate_ticket))
        .route("/checkin", post(admin::check_in_ticket))
        .route("/tickets", get(admin::list_tickets))
        .route("/stats", get(admin::dashboard_stats));

    Router::new()
        .route("/health", get(health_check))
        .nest("/user", user_routes)
        .nest("/admin", admin_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(create_security_headers_layer(config))
        .layer(create_cors_layer(config))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{header, Request, Response, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::auth::IdentityVerifier;
    use crate::providers::email::Mailer;
    use crate::providers::mocks::{RecordingMailer, StaticVerifier, StubRenderer};
    use crate::store::memory::MemoryTicketStore;
    use crate::store::TicketStore;

    struct TestApp {
        app: Router,
        mailer: Arc<RecordingMailer>,
        store: Arc<MemoryTicketStore>,
    }

    fn test_app_with_verifier(verifier: Arc<dyn IdentityVerifier>) -> TestApp {
        let config = Config::for_tests();
        let store = Arc::new(MemoryTicketStore::new());
        let mailer = Arc::new(RecordingMailer::new());
        let state = AppState::new(
            store.clone() as Arc<dyn TicketStore>,
            mailer.clone() as Arc<dyn Mailer>,
            Arc::new(StubRenderer),
            verifier,
            &config,
        );
        TestApp {
            app: create_routes(state, &config),
            mailer,
            store,
        }
    }

    fn test_app() -> TestApp {
        test_app_with_verifier(Arc::new(StaticVerifier::admin()))
    }

    async fn send(app: &Router, request: Request<Body>) -> Response<Body> {
        app.clone().oneshot(request).await.unwrap()
    }

    async fn post_json(app: &Router, path: &str, body: Value) -> Response<Body> {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap();
        send(app, request).await
    }

    async fn post_json_as_admin(
        app: &Router,
        path: &str,
        token: &str,
        body: Value,
    ) -> Response<Body> {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap();
        send(app, request).await
    }

    async fn read_json(response: Response<Body>) -> (StatusCode, Value) {
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = serde_json::from_slice(&bytes).unwrap();
        (status, body)
    }

    /// Registers an attendee end to end and returns the completed ticket id.
    async fn register(t: &TestApp, email: &str) -> String {
        let response = post_json(
            &t.app,
            "/user/initiate-verification",
            json!({ "email": email, "name": "Ada" }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let code = t.mailer.last_otp().unwrap();
        let response = post_json(
            &t.app,
            "/user/verify-otp",
            json!({ "email": email, "otp": code }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = post_json(
            &t.app,
            "/user/complete-registration",
            json!({
                "email": email,
                "name": "Ada Lovelace",
                "phone": "+2348012345678",
                "gender": "Female",
                "dob": "1995-12-10"
            }),
        )
        .await;
        let (status, body) = read_json(response).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        body["data"]["ticket"]["id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn health_endpoint_reports_ok() {
        let t = test_app();
        let request = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();

        let (status, body) = read_json(send(&t.app, request).await).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["service"], "gatepass-api");
    }

    #[tokio::test]
    async fn registration_flow_works_over_http() {
        let t = test_app();
        let id = register(&t, "ada@example.com").await;

        // The issued ticket can be downloaded as a PDF.
        let request = Request::builder()
            .uri(format!("/user/ticket/{id}/download"))
            .body(Body::empty())
            .unwrap();
        let response = send(&t.app, request).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/pdf"
        );
        let disposition = response
            .headers()
            .get(header::CONTENT_DISPOSITION)
            .unwrap()
            .to_str()
            .unwrap();
        assert!(disposition.starts_with("attachment; filename=\"Ticket-"));
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[tokio::test]
    async fn invalid_payloads_get_the_error_envelope() {
        let t = test_app();
        let response = post_json(
            &t.app,
            "/user/initiate-verification",
            json!({ "email": "not-an-email" }),
        )
        .await;

        let (status, body) = read_json(response).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn admin_routes_reject_missing_and_invalid_tokens() {
        let t = test_app();

        let response = post_json(&t.app, "/admin/validate-ticket", json!({ "qrData": "x" })).await;
        let (status, body) = read_json(response).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["code"], "AUTH_ERROR");

        let response =
            post_json_as_admin(&t.app, "/admin/validate-ticket", "bogus", json!({ "qrData": "x" }))
                .await;
        let (status, _) = read_json(response).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn admin_routes_reject_non_admin_identities() {
        let t = test_app_with_verifier(Arc::new(StaticVerifier::with_email(
            "visitor@example.com",
        )));

        let response = post_json_as_admin(
            &t.app,
            "/admin/validate-ticket",
            "valid-token",
            json!({ "qrData": "x" }),
        )
        .await;
        let (status, body) = read_json(response).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"]["code"], "FORBIDDEN");
    }

    #[tokio::test]
    async fn check_in_flow_works_over_http() {
        let t = test_app();
        register(&t, "ada@example.com").await;
        let qr_token = t
            .store
            .find_by_email("ada@example.com")
            .await
            .unwrap()
            .unwrap()
            .qr_token
            .unwrap();

        let response = post_json_as_admin(
            &t.app,
            "/admin/validate-ticket",
            "valid-token",
            json!({ "qrData": qr_token }),
        )
        .await;
        let (status, body) = read_json(response).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["ticket"]["holderName"], "Ada Lovelace");

        let response = post_json_as_admin(
            &t.app,
            "/admin/checkin",
            "valid-token",
            json!({ "qrData": qr_token }),
        )
        .await;
        let (status, body) = read_json(response).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["data"]["ticket"]["checkedInAt"].is_string());

        // A second scan is rejected with the admitted holder and timestamp.
        let response = post_json_as_admin(
            &t.app,
            "/admin/checkin",
            "valid-token",
            json!({ "qrData": qr_token }),
        )
        .await;
        let (status, body) = read_json(response).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["code"], "ALREADY_CHECKED_IN");
        assert_eq!(body["error"]["details"]["holderName"], "Ada Lovelace");
        assert!(body["error"]["details"]["checkedInAt"].is_string());
    }

    #[tokio::test]
    async fn admin_listing_and_stats_reflect_check_ins() {
        let t = test_app();
        register(&t, "ada@example.com").await;
        let qr_token = t
            .store
            .find_by_email("ada@example.com")
            .await
            .unwrap()
            .unwrap()
            .qr_token
            .unwrap();
        post_json_as_admin(
            &t.app,
            "/admin/checkin",
            "valid-token",
            json!({ "qrData": qr_token }),
        )
        .await;

        let request = Request::builder()
            .uri("/admin/tickets")
            .header(header::AUTHORIZATION, "Bearer valid-token")
            .body(Body::empty())
            .unwrap();
        let (status, body) = read_json(send(&t.app, request).await).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["count"], 1);
        assert!(body["data"]["tickets"][0].get("otpCode").is_none());

        let request = Request::builder()
            .uri("/admin/stats")
            .header(header::AUTHORIZATION, "Bearer valid-token")
            .body(Body::empty())
            .unwrap();
        let (status, body) = read_json(send(&t.app, request).await).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["metrics"]["totalTickets"], 1);
        assert_eq!(body["data"]["metrics"]["checkedIn"], 1);
        assert_eq!(
            body["data"]["recentCheckIns"][0]["holderEmail"],
            "ada@example.com"
        );
    }

    #[tokio::test]
    async fn login_flow_returns_the_qr_code() {
        let t = test_app();
        register(&t, "ada@example.com").await;

        let response = post_json(
            &t.app,
            "/user/send-login-otp",
            json!({ "email": "ada@example.com" }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let code = t.mailer.last_otp().unwrap();
        let response = post_json(
            &t.app,
            "/user/verify-login-otp",
            json!({ "email": "ada@example.com", "otp": code }),
        )
        .await;
        let (status, body) = read_json(response).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["ticket"]["holderName"], "Ada Lovelace");
        assert!(body["data"]["ticket"]["qrCode"]
            .as_str()
            .unwrap()
            .starts_with("data:qr/"));
    }
}
