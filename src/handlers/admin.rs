use axum::extract::State;
use axum::response::Response;
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

use crate::auth::AdminUser;
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::success;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ScanRequest {
    #[validate(length(min = 1, message = "QR data is required"))]
    pub qr_data: String,
}

pub async fn validate_ticket(
    _admin: AdminUser,
    State(state): State<AppState>,
    Json(req): Json<ScanRequest>,
) -> Result<Response, AppError> {
    req.validate()?;
    let ticket = state.checkin.validate(&req.qr_data).await?;
    Ok(success(json!({ "ticket": ticket }), "Valid ticket"))
}

pub async fn check_in_ticket(
    _admin: AdminUser,
    State(state): State<AppState>,
    Json(req): Json<ScanRequest>,
) -> Result<Response, AppError> {
    req.validate()?;
    let confirmation = state.checkin.check_in(&req.qr_data).await?;
    Ok(success(
        json!({ "ticket": confirmation }),
        "Check-in successful",
    ))
}

pub async fn list_tickets(
    _admin: AdminUser,
    State(state): State<AppState>,
) -> Result<Response, AppError> {
    let list = state.checkin.list_tickets().await?;
    Ok(success(list, "Tickets retrieved successfully."))
}

pub async fn dashboard_stats(
    _admin: AdminUser,
    State(state): State<AppState>,
) -> Result<Response, AppError> {
    let stats = state.checkin.dashboard_stats().await?;
    Ok(success(stats, "Dashboard stats retrieved successfully."))
}
