//! OpenAPI documentation

use axum::Router;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{auth, contracts, feedback, health, payments, penalties, rentals, stations, users, vehicles};
use crate::models::{
    contract, deposit, enums, feedback as feedback_model, payment, penalty, rental, station, user, vehicle,
};

/// Registers the JWT bearer scheme referenced by `security(("bearer_auth" = []))`
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "EV Rental API",
        version = "0.3.0",
        description = "Electric vehicle rental platform REST API"
    ),
    servers(
        (url = "/api", description = "API")
    ),
    modifiers(&SecurityAddon),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Auth
        auth::register,
        auth::login,
        auth::verify_otp,
        auth::verify_email,
        auth::resend_verification,
        auth::me,
        // Users
        users::list_users,
        users::get_user,
        users::update_user,
        users::update_role,
        users::delete_user,
        // Stations
        stations::list_stations,
        stations::get_station,
        stations::create_station,
        stations::update_station,
        stations::delete_station,
        // Vehicles
        vehicles::list_vehicles,
        vehicles::get_vehicle,
        vehicles::create_vehicle,
        vehicles::update_vehicle,
        vehicles::update_vehicle_status,
        vehicles::delete_vehicle,
        vehicles::list_vehicle_feedback,
        // Rentals
        rentals::create_rental,
        rentals::list_rentals,
        rentals::get_rental,
        rentals::check_in,
        rentals::check_out,
        rentals::cancel_rental,
        rentals::request_early_return,
        rentals::list_payments,
        rentals::get_deposit,
        rentals::refund_deposit,
        // Penalties
        penalties::list_catalog,
        penalties::create_catalog,
        penalties::update_catalog,
        penalties::delete_catalog,
        penalties::list_rental_penalties,
        penalties::create_rental_penalty,
        penalties::get_rental_penalty,
        penalties::settle_rental_penalty,
        penalties::update_rental_penalty,
        penalties::delete_rental_penalty,
        // Payments
        payments::create_payment,
        // Contracts
        contracts::create_contract,
        contracts::get_contract,
        contracts::sign_contract,
        // Feedback
        feedback::create_feedback,
    ),
    components(
        schemas(
            // Auth
            auth::LoginRequest,
            auth::LoginResponse,
            auth::LoginStatus,
            auth::UserInfo,
            auth::VerifyOtpRequest,
            auth::ResendVerificationRequest,
            auth::MessageResponse,
            // Users
            user::User,
            user::UserShort,
            user::RegisterRequest,
            user::UpdateUser,
            user::UpdateRole,
            // Stations and vehicles
            station::Station,
            station::CreateStation,
            station::UpdateStation,
            vehicle::Vehicle,
            vehicle::CreateVehicle,
            vehicle::UpdateVehicle,
            vehicle::UpdateVehicleStatus,
            // Rentals
            rental::Rental,
            rental::RentalDetails,
            rental::CreateRental,
            rental::CheckoutRequest,
            deposit::Deposit,
            payment::Payment,
            payment::CreatePayment,
            contract::Contract,
            feedback_model::Feedback,
            feedback_model::CreateFeedback,
            // Penalties
            penalty::Penalty,
            penalty::CreatePenalty,
            penalty::UpdatePenalty,
            penalty::RentalPenalty,
            penalty::CreateRentalPenalty,
            penalty::SettlePenalty,
            penalty::UpdateRentalPenalty,
            // Enums
            enums::Role,
            enums::UserStatus,
            enums::VehicleStatus,
            enums::RentalStatus,
            enums::DepositStatus,
            enums::PenaltyStatus,
            enums::PaymentMethod,
            enums::PaymentStatus,
            enums::ContractStatus,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Registration, login and OTP verification"),
        (name = "users", description = "User management"),
        (name = "stations", description = "Rental stations"),
        (name = "vehicles", description = "Vehicle fleet"),
        (name = "rentals", description = "Booking and rental lifecycle"),
        (name = "payments", description = "Rental payments"),
        (name = "deposits", description = "Rental deposits"),
        (name = "penalties", description = "Penalty catalog and rental penalties"),
        (name = "contracts", description = "Rental contracts"),
        (name = "feedback", description = "Customer feedback")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_penalty_routes_and_bearer_scheme() {
        let doc = ApiDoc::openapi();
        let paths = &doc.paths.paths;
        assert!(paths.contains_key("/rental/{id}/penalties"));
        assert!(paths.contains_key("/rental/penalties/{id}/settle"));
        assert!(paths.contains_key("/Authen/login"));

        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }
}
