//! Penalty endpoints: catalog and penalties charged against rentals

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::{
        penalty::{CreatePenalty, CreateRentalPenalty, SettlePenalty, UpdatePenalty, UpdateRentalPenalty},
        Penalty, RentalPenalty,
    },
};

use super::AuthenticatedUser;

/// List the penalty catalog
#[utoipa::path(
    get,
    path = "/penalty",
    tag = "penalties",
    responses(
        (status = 200, description = "Penalty types", body = Vec<Penalty>)
    )
)]
pub async fn list_catalog(State(state): State<crate::AppState>) -> AppResult<Json<Vec<Penalty>>> {
    let penalties = state.services.penalties.list_catalog().await?;
    Ok(Json(penalties))
}

#[utoipa::path(
    post,
    path = "/penalty",
    tag = "penalties",
    security(("bearer_auth" = [])),
    request_body = CreatePenalty,
    responses(
        (status = 201, description = "Penalty type created", body = Penalty),
        (status = 409, description = "Violation type already exists")
    )
)]
pub async fn create_catalog(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(penalty): Json<CreatePenalty>,
) -> AppResult<(StatusCode, Json<Penalty>)> {
    claims.require_admin()?;

    let created = state.services.penalties.create_catalog(penalty).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[utoipa::path(
    put,
    path = "/penalty/{id}",
    tag = "penalties",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Penalty type ID")
    ),
    request_body = UpdatePenalty,
    responses(
        (status = 200, description = "Penalty type updated", body = Penalty),
        (status = 404, description = "Penalty type not found")
    )
)]
pub async fn update_catalog(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(penalty): Json<UpdatePenalty>,
) -> AppResult<Json<Penalty>> {
    claims.require_admin()?;

    let updated = state.services.penalties.update_catalog(id, penalty).await?;
    Ok(Json(updated))
}

#[utoipa::path(
    delete,
    path = "/penalty/{id}",
    tag = "penalties",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Penalty type ID")
    ),
    responses(
        (status = 204, description = "Penalty type deleted"),
        (status = 404, description = "Penalty type not found"),
        (status = 409, description = "Penalty type in use")
    )
)]
pub async fn delete_catalog(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    claims.require_admin()?;

    state.services.penalties.delete_catalog(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Penalties charged against a rental
#[utoipa::path(
    get,
    path = "/rental/{id}/penalties",
    tag = "penalties",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Rental ID")
    ),
    responses(
        (status = 200, description = "Rental penalties", body = Vec<RentalPenalty>),
        (status = 404, description = "Rental not found")
    )
)]
pub async fn list_rental_penalties(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(rental_id): Path<i32>,
) -> AppResult<Json<Vec<RentalPenalty>>> {
    let penalties = state.services.penalties.list_for_rental(&claims, rental_id).await?;
    Ok(Json(penalties))
}

/// Charge a penalty against a rental
#[utoipa::path(
    post,
    path = "/rental/{id}/penalties",
    tag = "penalties",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Rental ID")
    ),
    request_body = CreateRentalPenalty,
    responses(
        (status = 201, description = "Penalty charged", body = RentalPenalty),
        (status = 400, description = "Invalid amount"),
        (status = 404, description = "Rental or penalty type not found"),
        (status = 409, description = "Penalty cannot be charged on this rental")
    )
)]
pub async fn create_rental_penalty(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(rental_id): Path<i32>,
    Json(request): Json<CreateRentalPenalty>,
) -> AppResult<(StatusCode, Json<RentalPenalty>)> {
    claims.require_staff()?;

    let penalty = state.services.penalties.create(rental_id, request).await?;
    Ok((StatusCode::CREATED, Json(penalty)))
}

#[utoipa::path(
    get,
    path = "/rental/penalties/{id}",
    tag = "penalties",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Rental penalty ID")
    ),
    responses(
        (status = 200, description = "Rental penalty", body = RentalPenalty),
        (status = 404, description = "Rental penalty not found")
    )
)]
pub async fn get_rental_penalty(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<RentalPenalty>> {
    let penalty = state.services.penalties.get(&claims, id).await?;
    Ok(Json(penalty))
}

/// Settle a penalty from the deposit and/or a payment
#[utoipa::path(
    post,
    path = "/rental/penalties/{id}/settle",
    tag = "penalties",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Rental penalty ID")
    ),
    request_body = SettlePenalty,
    responses(
        (status = 200, description = "Penalty after settlement", body = RentalPenalty),
        (status = 400, description = "Invalid payment"),
        (status = 404, description = "Rental penalty not found")
    )
)]
pub async fn settle_rental_penalty(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(request): Json<SettlePenalty>,
) -> AppResult<Json<RentalPenalty>> {
    claims.require_staff()?;

    let penalty = state.services.penalties.settle(id, request).await?;
    Ok(Json(penalty))
}

/// Change the amount of an unsettled penalty
#[utoipa::path(
    put,
    path = "/rental/penalties/{id}",
    tag = "penalties",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Rental penalty ID")
    ),
    request_body = UpdateRentalPenalty,
    responses(
        (status = 200, description = "Penalty updated", body = RentalPenalty),
        (status = 404, description = "Rental penalty not found"),
        (status = 409, description = "Penalty is settled")
    )
)]
pub async fn update_rental_penalty(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(request): Json<UpdateRentalPenalty>,
) -> AppResult<Json<RentalPenalty>> {
    claims.require_staff()?;

    let penalty = state.services.penalties.update(id, request).await?;
    Ok(Json(penalty))
}

#[utoipa::path(
    delete,
    path = "/rental/penalties/{id}",
    tag = "penalties",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Rental penalty ID")
    ),
    responses(
        (status = 204, description = "Penalty deleted, deposit share credited back"),
        (status = 404, description = "Rental penalty not found"),
        (status = 409, description = "Penalty is settled")
    )
)]
pub async fn delete_rental_penalty(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    claims.require_staff()?;

    state.services.penalties.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
