//! Station endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::{
    error::AppResult,
    models::station::{CreateStation, Station, UpdateStation},
};

use super::AuthenticatedUser;

#[derive(Deserialize, IntoParams)]
pub struct StationListParams {
    /// Include deactivated stations
    #[serde(default)]
    pub include_inactive: bool,
}

/// List stations
#[utoipa::path(
    get,
    path = "/station",
    tag = "stations",
    params(StationListParams),
    responses(
        (status = 200, description = "List of stations", body = Vec<Station>)
    )
)]
pub async fn list_stations(
    State(state): State<crate::AppState>,
    Query(params): Query<StationListParams>,
) -> AppResult<Json<Vec<Station>>> {
    let stations = state.services.stations.list(params.include_inactive).await?;
    Ok(Json(stations))
}

#[utoipa::path(
    get,
    path = "/station/{id}",
    tag = "stations",
    params(
        ("id" = i32, Path, description = "Station ID")
    ),
    responses(
        (status = 200, description = "Station details", body = Station),
        (status = 404, description = "Station not found")
    )
)]
pub async fn get_station(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<Station>> {
    let station = state.services.stations.get_by_id(id).await?;
    Ok(Json(station))
}

#[utoipa::path(
    post,
    path = "/station",
    tag = "stations",
    security(("bearer_auth" = [])),
    request_body = CreateStation,
    responses(
        (status = 201, description = "Station created", body = Station),
        (status = 400, description = "Invalid input"),
        (status = 403, description = "Admin privileges required")
    )
)]
pub async fn create_station(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(station): Json<CreateStation>,
) -> AppResult<(StatusCode, Json<Station>)> {
    claims.require_admin()?;

    let created = state.services.stations.create(station).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[utoipa::path(
    put,
    path = "/station/{id}",
    tag = "stations",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Station ID")
    ),
    request_body = UpdateStation,
    responses(
        (status = 200, description = "Station updated", body = Station),
        (status = 404, description = "Station not found")
    )
)]
pub async fn update_station(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(station): Json<UpdateStation>,
) -> AppResult<Json<Station>> {
    claims.require_admin()?;

    let updated = state.services.stations.update(id, station).await?;
    Ok(Json(updated))
}

#[utoipa::path(
    delete,
    path = "/station/{id}",
    tag = "stations",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Station ID")
    ),
    responses(
        (status = 204, description = "Station deleted"),
        (status = 404, description = "Station not found"),
        (status = 409, description = "Vehicles are still assigned")
    )
)]
pub async fn delete_station(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    claims.require_admin()?;

    state.services.stations.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
