//! Vehicle endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::{
        vehicle::{CreateVehicle, UpdateVehicle, UpdateVehicleStatus, VehicleQuery},
        Feedback, Vehicle,
    },
};

use super::AuthenticatedUser;

/// List vehicles, optionally by station and status
#[utoipa::path(
    get,
    path = "/vehicle",
    tag = "vehicles",
    params(VehicleQuery),
    responses(
        (status = 200, description = "List of vehicles", body = Vec<Vehicle>)
    )
)]
pub async fn list_vehicles(
    State(state): State<crate::AppState>,
    Query(query): Query<VehicleQuery>,
) -> AppResult<Json<Vec<Vehicle>>> {
    let vehicles = state.services.vehicles.list(&query).await?;
    Ok(Json(vehicles))
}

#[utoipa::path(
    get,
    path = "/vehicle/{id}",
    tag = "vehicles",
    params(
        ("id" = i32, Path, description = "Vehicle ID")
    ),
    responses(
        (status = 200, description = "Vehicle details", body = Vehicle),
        (status = 404, description = "Vehicle not found")
    )
)]
pub async fn get_vehicle(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<Vehicle>> {
    let vehicle = state.services.vehicles.get_by_id(id).await?;
    Ok(Json(vehicle))
}

#[utoipa::path(
    post,
    path = "/vehicle",
    tag = "vehicles",
    security(("bearer_auth" = [])),
    request_body = CreateVehicle,
    responses(
        (status = 201, description = "Vehicle created", body = Vehicle),
        (status = 400, description = "Invalid input"),
        (status = 409, description = "License plate already registered")
    )
)]
pub async fn create_vehicle(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(vehicle): Json<CreateVehicle>,
) -> AppResult<(StatusCode, Json<Vehicle>)> {
    claims.require_admin()?;

    let created = state.services.vehicles.create(vehicle).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[utoipa::path(
    put,
    path = "/vehicle/{id}",
    tag = "vehicles",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Vehicle ID")
    ),
    request_body = UpdateVehicle,
    responses(
        (status = 200, description = "Vehicle updated", body = Vehicle),
        (status = 404, description = "Vehicle not found")
    )
)]
pub async fn update_vehicle(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(vehicle): Json<UpdateVehicle>,
) -> AppResult<Json<Vehicle>> {
    claims.require_admin()?;

    let updated = state.services.vehicles.update(id, vehicle).await?;
    Ok(Json(updated))
}

/// Put a vehicle in or out of maintenance
#[utoipa::path(
    put,
    path = "/vehicle/{id}/status",
    tag = "vehicles",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Vehicle ID")
    ),
    request_body = UpdateVehicleStatus,
    responses(
        (status = 200, description = "Status updated", body = Vehicle),
        (status = 409, description = "Vehicle is held by a rental")
    )
)]
pub async fn update_vehicle_status(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(update): Json<UpdateVehicleStatus>,
) -> AppResult<Json<Vehicle>> {
    claims.require_staff()?;

    let vehicle = state.services.vehicles.set_status(id, update.status).await?;
    Ok(Json(vehicle))
}

#[utoipa::path(
    delete,
    path = "/vehicle/{id}",
    tag = "vehicles",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Vehicle ID")
    ),
    responses(
        (status = 204, description = "Vehicle deleted"),
        (status = 404, description = "Vehicle not found"),
        (status = 409, description = "Vehicle has an active rental")
    )
)]
pub async fn delete_vehicle(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    claims.require_admin()?;

    state.services.vehicles.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Customer ratings of a vehicle
#[utoipa::path(
    get,
    path = "/vehicle/{id}/feedback",
    tag = "vehicles",
    params(
        ("id" = i32, Path, description = "Vehicle ID")
    ),
    responses(
        (status = 200, description = "Feedback list", body = Vec<Feedback>),
        (status = 404, description = "Vehicle not found")
    )
)]
pub async fn list_vehicle_feedback(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<Vec<Feedback>>> {
    let feedback = state.services.vehicles.feedback(id).await?;
    Ok(Json(feedback))
}
