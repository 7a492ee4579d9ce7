//! Rental endpoints: booking, lifecycle and per-rental views

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::{
        rental::{CheckoutRequest, CreateRental, RentalQuery},
        Deposit, Payment, Rental, RentalDetails,
    },
};

use super::AuthenticatedUser;

/// Book a vehicle
#[utoipa::path(
    post,
    path = "/rental",
    tag = "rentals",
    security(("bearer_auth" = [])),
    request_body = CreateRental,
    responses(
        (status = 201, description = "Rental booked with its deposit", body = RentalDetails),
        (status = 400, description = "Invalid period"),
        (status = 409, description = "Vehicle unavailable for this period")
    )
)]
pub async fn create_rental(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<CreateRental>,
) -> AppResult<(StatusCode, Json<RentalDetails>)> {
    let rental = state.services.rentals.book(&claims, request).await?;
    Ok((StatusCode::CREATED, Json(rental)))
}

/// List rentals (own rentals for customers)
#[utoipa::path(
    get,
    path = "/rental",
    tag = "rentals",
    security(("bearer_auth" = [])),
    params(RentalQuery),
    responses(
        (status = 200, description = "List of rentals", body = Vec<Rental>)
    )
)]
pub async fn list_rentals(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<RentalQuery>,
) -> AppResult<Json<Vec<Rental>>> {
    let rentals = state.services.rentals.list(&claims, query).await?;
    Ok(Json(rentals))
}

#[utoipa::path(
    get,
    path = "/rental/{id}",
    tag = "rentals",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Rental ID")
    ),
    responses(
        (status = 200, description = "Rental with its deposit", body = RentalDetails),
        (status = 404, description = "Rental not found")
    )
)]
pub async fn get_rental(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<RentalDetails>> {
    let rental = state.services.rentals.details(&claims, id).await?;
    Ok(Json(rental))
}

/// Hand the vehicle to the customer
#[utoipa::path(
    post,
    path = "/rental/{id}/checkin",
    tag = "rentals",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Rental ID")
    ),
    responses(
        (status = 200, description = "Rental in progress", body = Rental),
        (status = 409, description = "Rental is not paid")
    )
)]
pub async fn check_in(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Rental>> {
    claims.require_staff()?;

    let rental = state.services.rentals.check_in(id).await?;
    Ok(Json(rental))
}

/// Take the vehicle back
#[utoipa::path(
    post,
    path = "/rental/{id}/checkout",
    tag = "rentals",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Rental ID")
    ),
    request_body = CheckoutRequest,
    responses(
        (status = 200, description = "Rental completed", body = Rental),
        (status = 409, description = "Rental is not in progress")
    )
)]
pub async fn check_out(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(request): Json<CheckoutRequest>,
) -> AppResult<Json<Rental>> {
    claims.require_staff()?;

    let rental = state.services.rentals.check_out(id, request).await?;
    Ok(Json(rental))
}

#[utoipa::path(
    post,
    path = "/rental/{id}/cancel",
    tag = "rentals",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Rental ID")
    ),
    responses(
        (status = 200, description = "Rental cancelled", body = Rental),
        (status = 409, description = "Rental can no longer be cancelled")
    )
)]
pub async fn cancel_rental(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Rental>> {
    let rental = state.services.rentals.cancel(&claims, id).await?;
    Ok(Json(rental))
}

/// Ask to return the vehicle before the booked end time
#[utoipa::path(
    post,
    path = "/rental/{id}/early-return",
    tag = "rentals",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Rental ID")
    ),
    responses(
        (status = 200, description = "Early return requested", body = Rental),
        (status = 409, description = "Rental is not in progress")
    )
)]
pub async fn request_early_return(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Rental>> {
    let rental = state.services.rentals.request_early_return(&claims, id).await?;
    Ok(Json(rental))
}

#[utoipa::path(
    get,
    path = "/rental/{id}/payments",
    tag = "payments",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Rental ID")
    ),
    responses(
        (status = 200, description = "Payments of the rental", body = Vec<Payment>)
    )
)]
pub async fn list_payments(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Vec<Payment>>> {
    let payments = state.services.payments.list_for_rental(&claims, id).await?;
    Ok(Json(payments))
}

#[utoipa::path(
    get,
    path = "/rental/{id}/deposit",
    tag = "deposits",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Rental ID")
    ),
    responses(
        (status = 200, description = "Deposit of the rental", body = Deposit),
        (status = 404, description = "Rental has no deposit")
    )
)]
pub async fn get_deposit(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Deposit>> {
    let deposit = state.services.deposits.get_for_rental(&claims, id).await?;
    Ok(Json(deposit))
}

/// Refund what is left of the deposit
#[utoipa::path(
    post,
    path = "/rental/{id}/deposit/refund",
    tag = "deposits",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Rental ID")
    ),
    responses(
        (status = 200, description = "Deposit refunded", body = Deposit),
        (status = 409, description = "Rental open, penalties unpaid or already refunded")
    )
)]
pub async fn refund_deposit(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Deposit>> {
    claims.require_staff()?;

    let deposit = state.services.deposits.refund(id).await?;
    Ok(Json(deposit))
}
