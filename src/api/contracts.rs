//! Contract endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{error::AppResult, models::Contract};

use super::AuthenticatedUser;

/// Draft the contract of a rental
#[utoipa::path(
    post,
    path = "/rental/{id}/contract",
    tag = "contracts",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Rental ID")
    ),
    responses(
        (status = 201, description = "Contract drafted", body = Contract),
        (status = 409, description = "Rental already has a contract")
    )
)]
pub async fn create_contract(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(rental_id): Path<i32>,
) -> AppResult<(StatusCode, Json<Contract>)> {
    claims.require_staff()?;

    let contract = state.services.contracts.create(rental_id).await?;
    Ok((StatusCode::CREATED, Json(contract)))
}

#[utoipa::path(
    get,
    path = "/contract/{id}",
    tag = "contracts",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Contract ID")
    ),
    responses(
        (status = 200, description = "Contract", body = Contract),
        (status = 404, description = "Contract not found")
    )
)]
pub async fn get_contract(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Contract>> {
    let contract = state.services.contracts.get(&claims, id).await?;
    Ok(Json(contract))
}

/// Sign the contract (renter only)
#[utoipa::path(
    post,
    path = "/contract/{id}/sign",
    tag = "contracts",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Contract ID")
    ),
    responses(
        (status = 200, description = "Contract signed", body = Contract),
        (status = 409, description = "Contract already signed")
    )
)]
pub async fn sign_contract(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Contract>> {
    let contract = state.services.contracts.sign(&claims, id).await?;
    Ok(Json(contract))
}
