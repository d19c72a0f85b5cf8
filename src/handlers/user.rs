use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::models::ticket::GENDERS;
use crate::services::registration::CompletedProfile;
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::{empty_success, success};

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct InitiateVerificationRequest {
    #[validate(email(message = "Valid email is required"))]
    pub email: String,
    pub name: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct VerifyOtpRequest {
    #[validate(email(message = "Valid email is required"))]
    pub email: String,
    #[validate(length(min = 6, max = 6, message = "OTP must be 6 digits"))]
    pub otp: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CompleteRegistrationRequest {
    #[validate(email(message = "Valid email is required"))]
    pub email: String,
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[validate(length(min = 1, message = "Phone number is required"))]
    pub phone: String,
    pub gender: String,
    pub dob: NaiveDate,
    pub referral_source: Option<String>,
    pub referral_details: Option<String>,
    pub buying_interest: Option<String>,
    pub buying_interest_details: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct EmailOnlyRequest {
    #[validate(email(message = "Valid email is required"))]
    pub email: String,
}

fn ensure_known_gender(gender: &str) -> Result<(), AppError> {
    if GENDERS.contains(&gender) {
        Ok(())
    } else {
        Err(AppError::ValidationError(
            "Gender must be Male, Female or Other.".to_string(),
        ))
    }
}

pub async fn initiate_verification(
    State(state): State<AppState>,
    Json(req): Json<InitiateVerificationRequest>,
) -> Result<Response, AppError> {
    req.validate()?;
    state
        .registration
        .initiate(&req.email, req.name.as_deref())
        .await?;
    Ok(empty_success("OTP sent successfully."))
}

pub async fn verify_otp(
    State(state): State<AppState>,
    Json(req): Json<VerifyOtpRequest>,
) -> Result<Response, AppError> {
    req.validate()?;
    state.registration.verify_email(&req.email, &req.otp).await?;
    Ok(empty_success("Email verified successfully."))
}

pub async fn complete_registration(
    State(state): State<AppState>,
    Json(req): Json<CompleteRegistrationRequest>,
) -> Result<Response, AppError> {
    req.validate()?;
    ensure_known_gender(&req.gender)?;

    let profile = CompletedProfile {
        name: req.name,
        phone: req.phone,
        gender: req.gender,
        dob: req.dob,
        referral_source: req.referral_source,
        referral_details: req.referral_details,
        buying_interest: req.buying_interest,
        buying_interest_details: req.buying_interest_details,
    };
    let ticket = state.registration.complete(&req.email, profile).await?;
    Ok(success(json!({ "ticket": ticket }), "Registration complete!"))
}

pub async fn resend_otp(
    State(state): State<AppState>,
    Json(req): Json<EmailOnlyRequest>,
) -> Result<Response, AppError> {
    req.validate()?;
    state.registration.resend(&req.email).await?;
    Ok(empty_success("OTP resent successfully."))
}

pub async fn check_email(
    State(state): State<AppState>,
    Json(req): Json<EmailOnlyRequest>,
) -> Result<Response, AppError> {
    req.validate()?;
    let exists = state.registration.email_status(&req.email).await?;
    let message = if exists {
        "This email is already registered."
    } else {
        "Email is available."
    };
    Ok(success(json!({ "exists": exists }), message))
}

pub async fn send_login_otp(
    State(state): State<AppState>,
    Json(req): Json<EmailOnlyRequest>,
) -> Result<Response, AppError> {
    req.validate()?;
    state.login.request_otp(&req.email).await?;
    Ok(empty_success("OTP sent to your email."))
}

pub async fn verify_login_otp(
    State(state): State<AppState>,
    Json(req): Json<VerifyOtpRequest>,
) -> Result<Response, AppError> {
    req.validate()?;
    let ticket = state.login.verify_otp(&req.email, &req.otp).await?;
    Ok(success(json!({ "ticket": ticket }), "Login successful."))
}

pub async fn download_ticket(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let (filename, pdf) = state.tickets.entry_pass_pdf(id).await?;
    let headers = [
        (header::CONTENT_TYPE, "application/pdf".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{filename}\""),
        ),
    ];
    Ok((headers, pdf).into_response())
}

pub async fn email_ticket(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    state.tickets.email_entry_pass(id).await?;
    Ok(empty_success("Ticket email sent successfully!"))
}
