//! Payment endpoints

use axum::{extract::State, http::StatusCode, Json};

use crate::{
    error::AppResult,
    models::{payment::CreatePayment, Payment},
};

use super::AuthenticatedUser;

/// Record a payment for a rental
#[utoipa::path(
    post,
    path = "/payment",
    tag = "payments",
    security(("bearer_auth" = [])),
    request_body = CreatePayment,
    responses(
        (status = 201, description = "Payment recorded", body = Payment),
        (status = 400, description = "Invalid amount or method"),
        (status = 409, description = "Rental cancelled")
    )
)]
pub async fn create_payment(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(payment): Json<CreatePayment>,
) -> AppResult<(StatusCode, Json<Payment>)> {
    let created = state.services.payments.create(&claims, payment).await?;
    Ok((StatusCode::CREATED, Json(created)))
}
