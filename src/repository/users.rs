//! Users repository for database operations

use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres, QueryBuilder};

use crate::{
    error::{AppError, AppResult},
    models::{
        user::{UpdateUser, UserQuery},
        Role, User, UserShort, UserStatus,
    },
};

/// Fields of a new account
pub struct NewUser<'a> {
    pub email: &'a str,
    pub password_hash: &'a str,
    pub full_name: &'a str,
    pub phone: Option<&'a str>,
    pub identity_number: Option<&'a str>,
    pub role: Role,
    pub verification_token: Option<&'a str>,
    pub verification_sent_at: Option<DateTime<Utc>>,
}

#[derive(Clone)]
pub struct UsersRepository {
    pool: Pool<Postgres>,
}

impl UsersRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get user by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<User> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))
    }

    /// Get user by email (login identifier)
    pub async fn get_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE LOWER(email) = LOWER($1)")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    pub async fn get_by_verification_token(&self, token: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE verification_token = $1")
            .bind(token)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// Check if email already exists
    pub async fn email_exists(&self, email: &str) -> AppResult<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE LOWER(email) = LOWER($1))")
                .bind(email)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    pub async fn create(&self, user: &NewUser<'_>) -> AppResult<User> {
        let created = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, password, full_name, phone, identity_number, role,
                               verification_token, verification_sent_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(user.email)
        .bind(user.password_hash)
        .bind(user.full_name)
        .bind(user.phone)
        .bind(user.identity_number)
        .bind(user.role)
        .bind(user.verification_token)
        .bind(user.verification_sent_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    /// Search users with pagination
    pub async fn search(&self, query: &UserQuery) -> AppResult<(Vec<UserShort>, i64)> {
        let page = query.page.unwrap_or(1).max(1);
        let per_page = query.per_page.unwrap_or(20).clamp(1, 100);
        let offset = (page - 1) * per_page;

        fn push_filters<'a>(builder: &mut QueryBuilder<'a, Postgres>, query: &'a UserQuery) {
            builder.push(" WHERE TRUE");
            if let Some(ref q) = query.q {
                let pattern = format!("%{}%", q.to_lowercase());
                builder
                    .push(" AND (LOWER(u.full_name) LIKE ")
                    .push_bind(pattern.clone())
                    .push(" OR LOWER(u.email) LIKE ")
                    .push_bind(pattern)
                    .push(")");
            }
            if let Some(role) = query.role {
                builder.push(" AND u.role = ").push_bind(role);
            }
        }

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM users u");
        push_filters(&mut count, query);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::<Postgres>::new(
            r#"
            SELECT u.id, u.email, u.full_name, u.role, u.status,
                   (SELECT COUNT(*) FROM rentals r WHERE r.user_id = u.id) as nb_rentals
            FROM users u
            "#,
        );
        push_filters(&mut select, query);
        select
            .push(" ORDER BY u.full_name, u.id LIMIT ")
            .push_bind(per_page)
            .push(" OFFSET ")
            .push_bind(offset);

        let users = select
            .build_query_as::<UserShort>()
            .fetch_all(&self.pool)
            .await?;

        Ok((users, total))
    }

    /// Update profile fields; absent fields are left untouched
    pub async fn update(&self, id: i32, user: &UpdateUser, password_hash: Option<String>) -> AppResult<User> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET
                full_name = COALESCE($2, full_name),
                phone = COALESCE($3, phone),
                identity_number = COALESCE($4, identity_number),
                password = COALESCE($5, password),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&user.full_name)
        .bind(&user.phone)
        .bind(&user.identity_number)
        .bind(password_hash)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))
    }

    pub async fn update_role(&self, id: i32, role: Role, station_id: Option<i32>) -> AppResult<User> {
        sqlx::query_as::<_, User>(
            "UPDATE users SET role = $2, station_id = $3, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(role)
        .bind(station_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))
    }

    pub async fn mark_email_verified(&self, id: i32) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE users SET email_verified = TRUE, verification_token = NULL, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Record a freshly sent verification email
    pub async fn set_verification(&self, id: i32, token: &str, sent_at: DateTime<Utc>) -> AppResult<()> {
        sqlx::query("UPDATE users SET verification_token = $2, verification_sent_at = $3 WHERE id = $1")
            .bind(id)
            .bind(token)
            .bind(sent_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn set_status(&self, id: i32, status: UserStatus) -> AppResult<()> {
        let result = sqlx::query("UPDATE users SET status = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(status)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("User with id {} not found", id)));
        }
        Ok(())
    }

    pub async fn has_rentals(&self, id: i32) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM rentals WHERE user_id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("User with id {} not found", id)));
        }
        Ok(())
    }
}
