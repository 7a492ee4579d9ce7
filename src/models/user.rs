//! User model and related types

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::enums::{Role, UserStatus};
use crate::error::AppError;

/// Vietnamese mobile numbers: 0xxxxxxxxx or +84xxxxxxxxx
pub static PHONE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(0|\+84)[35789][0-9]{8}$").expect("valid phone regex"));

/// Citizen identity number (CMND 9 digits or CCCD 12 digits)
pub static IDENTITY_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([0-9]{9}|[0-9]{12})$").expect("valid identity regex"));

/// Full user model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct User {
    pub id: i32,
    pub email: String,
    /// Hashed password (argon2)
    #[serde(skip_serializing)]
    pub password: String,
    pub full_name: String,
    pub phone: Option<String>,
    pub identity_number: Option<String>,
    pub role: Role,
    /// Home station for station staff
    pub station_id: Option<i32>,
    pub email_verified: bool,
    #[serde(skip_serializing)]
    pub verification_token: Option<String>,
    #[serde(skip_serializing)]
    pub verification_sent_at: Option<DateTime<Utc>>,
    pub status: UserStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Short user representation for lists
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct UserShort {
    pub id: i32,
    pub email: String,
    pub full_name: String,
    pub role: Role,
    pub status: UserStatus,
    pub nb_rentals: Option<i64>,
}

/// User query parameters
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct UserQuery {
    /// Matches name or email
    pub q: Option<String>,
    pub role: Option<Role>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// Self-registration request (always creates a customer)
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
    #[validate(length(min = 2, max = 120, message = "Full name must be 2-120 characters"))]
    pub full_name: String,
    #[validate(regex(path = *PHONE_REGEX, message = "Invalid phone number"))]
    pub phone: Option<String>,
    #[validate(regex(path = *IDENTITY_REGEX, message = "Identity number must have 9 or 12 digits"))]
    pub identity_number: Option<String>,
}

/// Update user request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateUser {
    #[validate(length(min = 2, max = 120, message = "Full name must be 2-120 characters"))]
    pub full_name: Option<String>,
    #[validate(regex(path = *PHONE_REGEX, message = "Invalid phone number"))]
    pub phone: Option<String>,
    #[validate(regex(path = *IDENTITY_REGEX, message = "Identity number must have 9 or 12 digits"))]
    pub identity_number: Option<String>,
    /// Current password (required to change password on one's own account)
    pub current_password: Option<String>,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub new_password: Option<String>,
}

/// Update role request (admin only)
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateRole {
    pub role: Role,
    /// Home station, meaningful for STAFF_STATION
    pub station_id: Option<i32>,
}

/// JWT Claims for authenticated users
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserClaims {
    pub sub: String,
    pub user_id: i32,
    pub role: Role,
    pub exp: i64,
    pub iat: i64,
}

impl UserClaims {
    /// Create a new JWT token
    pub fn create_token(&self, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{encode, EncodingKey, Header};
        encode(
            &Header::default(),
            self,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
    }

    /// Parse JWT token
    pub fn from_token(token: &str, secret: &str) -> Result<Self, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{decode, DecodingKey, Validation};
        let token_data = decode::<Self>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )?;
        Ok(token_data.claims)
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn is_staff(&self) -> bool {
        self.role.is_staff()
    }

    /// Require admin privileges
    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::Authorization("Administrator privileges required".to_string()))
        }
    }

    /// Require station staff or admin
    pub fn require_staff(&self) -> Result<(), AppError> {
        if self.is_staff() {
            Ok(())
        } else {
            Err(AppError::Authorization("Staff privileges required".to_string()))
        }
    }

    /// Allow the owner of a resource, or staff
    pub fn require_self_or_staff(&self, owner_id: i32) -> Result<(), AppError> {
        if self.user_id == owner_id || self.is_staff() {
            Ok(())
        } else {
            Err(AppError::Authorization("Access to another user's data is not allowed".to_string()))
        }
    }
}
