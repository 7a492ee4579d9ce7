//! User management service

use validator::Validate;

use super::auth::{hash_secret, verify_secret};
use crate::{
    error::{AppError, AppResult},
    models::{
        user::{UpdateRole, UpdateUser, UserClaims, UserQuery},
        Role, User, UserShort, UserStatus,
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct UsersService {
    repository: Repository,
}

impl UsersService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<User> {
        self.repository.users.get_by_id(id).await
    }

    pub async fn search_users(&self, query: &UserQuery) -> AppResult<(Vec<UserShort>, i64)> {
        self.repository.users.search(query).await
    }

    /// Update profile fields. Changing one's own password requires the current one.
    pub async fn update_user(&self, caller: &UserClaims, id: i32, update: UpdateUser) -> AppResult<User> {
        if caller.user_id != id {
            caller.require_admin()?;
        }
        update.validate()?;

        let user = self.repository.users.get_by_id(id).await?;

        let password_hash = match update.new_password.as_deref() {
            Some(new_password) => {
                if caller.user_id == id {
                    let current = update.current_password.as_deref().ok_or_else(|| {
                        AppError::Validation("Current password required to change password".to_string())
                    })?;
                    if !verify_secret(current, &user.password)? {
                        return Err(AppError::Authentication("Current password is incorrect".to_string()));
                    }
                }
                Some(hash_secret(new_password)?)
            }
            None => None,
        };

        let updated = self.repository.users.update(id, &update, password_hash).await?;
        tracing::info!(user_id = id, by = caller.user_id, "User updated");
        Ok(updated)
    }

    pub async fn update_role(&self, id: i32, update: UpdateRole) -> AppResult<User> {
        let station_id = match update.role {
            Role::StaffStation => {
                let station_id = update.station_id.ok_or_else(|| {
                    AppError::Validation("Station staff must be assigned to a station".to_string())
                })?;
                self.repository.stations.get_by_id(station_id).await?;
                Some(station_id)
            }
            _ => None,
        };

        let user = self.repository.users.update_role(id, update.role, station_id).await?;
        tracing::info!(user_id = id, role = %user.role, "User role changed");
        Ok(user)
    }

    /// Delete an account, or block it when rentals reference it
    pub async fn delete_user(&self, caller: &UserClaims, id: i32) -> AppResult<()> {
        if caller.user_id == id {
            return Err(AppError::InvalidState("You cannot delete your own account".to_string()));
        }

        if self.repository.users.has_rentals(id).await? {
            self.repository.users.set_status(id, UserStatus::Blocked).await?;
            tracing::info!(user_id = id, "User has rentals, account blocked instead of deleted");
        } else {
            self.repository.users.delete(id).await?;
            tracing::info!(user_id = id, "User deleted");
        }
        Ok(())
    }
}
