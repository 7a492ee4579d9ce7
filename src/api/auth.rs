//! Authentication endpoints

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::{
    error::AppResult,
    models::{user::RegisterRequest, User},
    services::auth::LoginOutcome,
};

use super::AuthenticatedUser;

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    /// Stable identifier of the client device, used to skip the OTP step
    pub device_id: Option<String>,
}

/// Login step reached by the request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum LoginStatus {
    Authenticated,
    OtpRequired,
    VerificationRequired,
}

#[derive(Serialize, ToSchema)]
pub struct LoginResponse {
    pub status: LoginStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    /// Opaque id to send back with the OTP code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub user: UserInfo,
    pub message: String,
}

/// User summary with the role token understood by the web client
#[derive(Serialize, ToSchema)]
pub struct UserInfo {
    pub id: i32,
    pub email: String,
    pub full_name: String,
    /// ADMIN, STAFF or RENTER
    pub role: String,
    pub station_id: Option<i32>,
    pub email_verified: bool,
}

impl From<&User> for UserInfo {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            full_name: user.full_name.clone(),
            role: user.role.client_token().to_string(),
            station_id: user.station_id,
            email_verified: user.email_verified,
        }
    }
}

impl LoginResponse {
    fn authenticated(token: String, user: &User) -> Self {
        Self {
            status: LoginStatus::Authenticated,
            token: Some(token),
            token_type: Some("Bearer".to_string()),
            request_id: None,
            user: user.into(),
            message: "Login successful".to_string(),
        }
    }
}

impl From<LoginOutcome> for LoginResponse {
    fn from(outcome: LoginOutcome) -> Self {
        match outcome {
            LoginOutcome::Authenticated { token, user } => Self::authenticated(token, &user),
            LoginOutcome::OtpRequired { request_id, user } => Self {
                status: LoginStatus::OtpRequired,
                token: None,
                token_type: None,
                request_id: Some(request_id),
                user: (&user).into(),
                message: "A verification code has been sent to your email".to_string(),
            },
            LoginOutcome::VerificationRequired { user, resent } => Self {
                status: LoginStatus::VerificationRequired,
                token: None,
                token_type: None,
                request_id: None,
                user: (&user).into(),
                message: if resent {
                    "Please verify your email address, a new link has been sent".to_string()
                } else {
                    "Please verify your email address using the link already sent".to_string()
                },
            },
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct VerifyOtpRequest {
    pub request_id: String,
    pub code: String,
    pub device_id: Option<String>,
    /// Skip the OTP step on this device for the next logins
    #[serde(default)]
    pub trust_device: bool,
}

#[derive(Deserialize, IntoParams)]
pub struct VerifyEmailQuery {
    pub token: String,
}

#[derive(Deserialize, ToSchema)]
pub struct ResendVerificationRequest {
    pub email: String,
}

#[derive(Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

/// Register a customer account
#[utoipa::path(
    post,
    path = "/Authen/register",
    tag = "auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created, verification email sent", body = UserInfo),
        (status = 400, description = "Invalid input"),
        (status = 409, description = "Email already registered")
    )
)]
pub async fn register(
    State(state): State<crate::AppState>,
    Json(request): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<UserInfo>)> {
    let user = state.services.auth.register(request).await?;
    Ok((StatusCode::CREATED, Json((&user).into())))
}

/// Login with email and password
#[utoipa::path(
    post,
    path = "/Authen/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token issued, or next step required", body = LoginResponse),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(
    State(state): State<crate::AppState>,
    Json(request): Json<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let outcome = state
        .services
        .auth
        .login(&request.email, &request.password, request.device_id.as_deref())
        .await?;
    Ok(Json(outcome.into()))
}

/// Complete a login with the emailed code
#[utoipa::path(
    post,
    path = "/Authen/verify-otp",
    tag = "auth",
    request_body = VerifyOtpRequest,
    responses(
        (status = 200, description = "Token issued", body = LoginResponse),
        (status = 401, description = "Invalid or expired code")
    )
)]
pub async fn verify_otp(
    State(state): State<crate::AppState>,
    Json(request): Json<VerifyOtpRequest>,
) -> AppResult<Json<LoginResponse>> {
    let (token, user) = state
        .services
        .auth
        .verify_otp(
            &request.request_id,
            &request.code,
            request.device_id.as_deref(),
            request.trust_device,
        )
        .await?;
    Ok(Json(LoginResponse::authenticated(token, &user)))
}

/// Confirm an email address
#[utoipa::path(
    get,
    path = "/Authen/verify-email",
    tag = "auth",
    params(VerifyEmailQuery),
    responses(
        (status = 200, description = "Email verified", body = UserInfo),
        (status = 404, description = "Unknown verification link")
    )
)]
pub async fn verify_email(
    State(state): State<crate::AppState>,
    Query(query): Query<VerifyEmailQuery>,
) -> AppResult<Json<UserInfo>> {
    let user = state.services.auth.verify_email(&query.token).await?;
    Ok(Json((&user).into()))
}

/// Send the verification email again
#[utoipa::path(
    post,
    path = "/Authen/resend-verification",
    tag = "auth",
    request_body = ResendVerificationRequest,
    responses(
        (status = 200, description = "Resend handled", body = MessageResponse),
        (status = 404, description = "Unknown email"),
        (status = 409, description = "Email already verified")
    )
)]
pub async fn resend_verification(
    State(state): State<crate::AppState>,
    Json(request): Json<ResendVerificationRequest>,
) -> AppResult<Json<MessageResponse>> {
    let sent = state.services.auth.resend_verification(&request.email).await?;
    let message = if sent {
        "Verification email sent"
    } else {
        "A verification email was sent recently, please check your inbox"
    };
    Ok(Json(MessageResponse {
        message: message.to_string(),
    }))
}

/// Current user
#[utoipa::path(
    get,
    path = "/Authen/me",
    tag = "auth",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Current user", body = User),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn me(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<User>> {
    let user = state.services.auth.me(claims.user_id).await?;
    Ok(Json(user))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Role, UserStatus};
    use chrono::Utc;

    fn user(role: Role) -> User {
        let now = Utc::now();
        User {
            id: 4,
            email: "staff@evrental.vn".to_string(),
            password: "hash".to_string(),
            full_name: "Le Van Staff".to_string(),
            phone: None,
            identity_number: None,
            role,
            station_id: Some(2),
            email_verified: true,
            verification_token: None,
            verification_sent_at: None,
            status: UserStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_otp_response_carries_request_id_not_token() {
        let response: LoginResponse = LoginOutcome::OtpRequired {
            request_id: "abc".to_string(),
            user: user(Role::StaffStation),
        }
        .into();

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["status"], "otp_required");
        assert_eq!(json["request_id"], "abc");
        assert_eq!(json["user"]["role"], "STAFF");
        assert!(json.get("token").is_none());
    }

    #[test]
    fn test_authenticated_response() {
        let response = LoginResponse::authenticated("jwt".to_string(), &user(Role::Customer));
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["status"], "authenticated");
        assert_eq!(json["token"], "jwt");
        assert_eq!(json["token_type"], "Bearer");
        assert_eq!(json["user"]["role"], "RENTER");
        assert!(json.get("request_id").is_none());
    }
}
