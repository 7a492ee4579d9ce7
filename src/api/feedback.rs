//! Feedback endpoints

use axum::{extract::State, http::StatusCode, Json};

use crate::{
    error::AppResult,
    models::{feedback::CreateFeedback, Feedback},
};

use super::AuthenticatedUser;

/// Rate a completed rental
#[utoipa::path(
    post,
    path = "/feedback",
    tag = "feedback",
    security(("bearer_auth" = [])),
    request_body = CreateFeedback,
    responses(
        (status = 201, description = "Feedback recorded", body = Feedback),
        (status = 400, description = "Rating out of range"),
        (status = 409, description = "Rental not completed or already rated")
    )
)]
pub async fn create_feedback(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(feedback): Json<CreateFeedback>,
) -> AppResult<(StatusCode, Json<Feedback>)> {
    let created = state.services.feedback.create(&claims, feedback).await?;
    Ok((StatusCode::CREATED, Json(created)))
}
