//! Authentication service: registration, login gate and OTP verification

use std::sync::Arc;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Duration, Utc};
use once_cell::sync::Lazy;
use rand::{Rng, RngCore};
use uuid::Uuid;
use validator::Validate;

use super::{
    email::Mailer,
    redis::{OtpChallenge, RedisService},
};
use crate::{
    config::AuthConfig,
    error::{AppError, AppResult},
    models::{
        user::{RegisterRequest, UserClaims},
        Role, User, UserStatus,
    },
    repository::{users::NewUser, Repository},
};

/// What a successful password check leads to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginStep {
    /// Customer must confirm the email address first
    VerificationRequired,
    /// Privileged account on an unknown device
    OtpRequired,
    IssueToken,
}

/// Decide the next login step for an authenticated password
pub fn login_step(role: Role, email_verified: bool, device_trusted: bool) -> LoginStep {
    if role.is_privileged() {
        if device_trusted {
            LoginStep::IssueToken
        } else {
            LoginStep::OtpRequired
        }
    } else if !email_verified {
        LoginStep::VerificationRequired
    } else {
        LoginStep::IssueToken
    }
}

/// True when no verification email went out in the last `threshold_minutes`
pub fn verification_resend_due(
    last_sent: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    threshold_minutes: i64,
) -> bool {
    match last_sent {
        Some(sent_at) => now - sent_at >= Duration::minutes(threshold_minutes),
        None => true,
    }
}

/// Result of `AuthService::login`
#[derive(Debug)]
pub enum LoginOutcome {
    Authenticated { token: String, user: User },
    OtpRequired { request_id: String, user: User },
    VerificationRequired { user: User, resent: bool },
}

/// Hash a password or one-time code using Argon2
pub fn hash_secret(secret: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(secret.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(format!("Failed to hash secret: {}", e)))?;
    Ok(hash.to_string())
}

pub fn verify_secret(secret: &str, hash: &str) -> AppResult<bool> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|_| AppError::Internal("Invalid password hash".to_string()))?;
    Ok(Argon2::default()
        .verify_password(secret.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Six-digit numeric login code
pub fn generate_otp() -> String {
    format!("{:06}", rand::thread_rng().gen_range(0..1_000_000))
}

/// Checked against when the email is unknown, so both paths cost one argon2 verify
static UNKNOWN_USER_HASH: Lazy<Option<String>> = Lazy::new(|| hash_secret("evrental-unknown-user").ok());

fn generate_verification_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Verification link mails, throttled per account
pub struct VerificationMail<'a> {
    mailer: &'a dyn Mailer,
    public_url: &'a str,
    resend_minutes: i64,
}

impl<'a> VerificationMail<'a> {
    pub fn new(mailer: &'a dyn Mailer, config: &'a AuthConfig) -> Self {
        Self {
            mailer,
            public_url: config.public_url.trim_end_matches('/'),
            resend_minutes: config.verification_resend_minutes,
        }
    }

    pub fn link(&self, token: &str) -> String {
        format!("{}/api/Authen/verify-email?token={}", self.public_url, token)
    }

    pub async fn send(&self, user: &User, token: &str) -> AppResult<()> {
        self.mailer.send_verification(&user.email, &self.link(token)).await
    }

    /// Send the link unless one already went out within the resend window.
    /// Returns whether a mail was sent.
    pub async fn send_if_due(&self, user: &User, token: &str, now: DateTime<Utc>) -> AppResult<bool> {
        if !verification_resend_due(user.verification_sent_at, now, self.resend_minutes) {
            tracing::debug!(user_id = user.id, "Verification email sent recently, not resending");
            return Ok(false);
        }
        self.send(user, token).await?;
        Ok(true)
    }
}

#[derive(Clone)]
pub struct AuthService {
    repository: Repository,
    config: AuthConfig,
    redis: RedisService,
    mailer: Arc<dyn Mailer>,
}

impl AuthService {
    pub fn new(repository: Repository, config: AuthConfig, redis: RedisService, mailer: Arc<dyn Mailer>) -> Self {
        Self {
            repository,
            config,
            redis,
            mailer,
        }
    }

    /// Create a customer account and send its verification link
    pub async fn register(&self, request: RegisterRequest) -> AppResult<User> {
        request.validate()?;

        let email = request.email.trim().to_lowercase();
        if self.repository.users.email_exists(&email).await? {
            return Err(AppError::Conflict("Email is already registered".to_string()));
        }

        let password_hash = hash_secret(&request.password)?;
        let token = generate_verification_token();
        let now = Utc::now();

        let user = self
            .repository
            .users
            .create(&NewUser {
                email: &email,
                password_hash: &password_hash,
                full_name: request.full_name.trim(),
                phone: request.phone.as_deref(),
                identity_number: request.identity_number.as_deref(),
                role: Role::Customer,
                verification_token: Some(&token),
                verification_sent_at: Some(now),
            })
            .await?;

        tracing::info!(user_id = user.id, "Customer account registered");

        // The account exists even if the mail server is down; the link can be resent
        if let Err(e) = self.verification_mail().send(&user, &token).await {
            tracing::warn!(user_id = user.id, error = %e, "Failed to send verification email");
        }

        Ok(user)
    }

    /// Check credentials and run the login gate
    pub async fn login(&self, email: &str, password: &str, device_id: Option<&str>) -> AppResult<LoginOutcome> {
        let invalid = || AppError::Authentication("Invalid email or password".to_string());

        let Some(user) = self.repository.users.get_by_email(email.trim()).await? else {
            if let Some(hash) = UNKNOWN_USER_HASH.as_deref() {
                let _ = verify_secret(password, hash);
            }
            return Err(invalid());
        };

        if !verify_secret(password, &user.password)? {
            tracing::info!(user_id = user.id, "Login rejected: wrong password");
            return Err(invalid());
        }

        if user.status == UserStatus::Blocked {
            return Err(AppError::Authentication("Account is blocked".to_string()));
        }

        let device_trusted = match device_id.filter(|d| !d.trim().is_empty()) {
            Some(device) if user.role.is_privileged() => self.redis.is_device_trusted(user.id, device).await?,
            _ => false,
        };

        match login_step(user.role, user.email_verified, device_trusted) {
            LoginStep::IssueToken => {
                let token = self.issue_token(&user)?;
                tracing::info!(user_id = user.id, role = %user.role, device_trusted, "User logged in");
                Ok(LoginOutcome::Authenticated { token, user })
            }
            LoginStep::VerificationRequired => {
                let resent = self.resend_verification_if_due(&user).await?;
                Ok(LoginOutcome::VerificationRequired { user, resent })
            }
            LoginStep::OtpRequired => {
                let request_id = self.start_otp_challenge(&user).await?;
                Ok(LoginOutcome::OtpRequired { request_id, user })
            }
        }
    }

    async fn start_otp_challenge(&self, user: &User) -> AppResult<String> {
        let code = generate_otp();
        let request_id = Uuid::new_v4().simple().to_string();
        let challenge = OtpChallenge {
            user_id: user.id,
            code_hash: hash_secret(&code)?,
        };

        self.redis
            .store_otp_challenge(&request_id, &challenge, self.config.otp_ttl_minutes * 60)
            .await?;
        self.mailer
            .send_otp_code(&user.email, &code, self.config.otp_ttl_minutes)
            .await?;

        tracing::info!(user_id = user.id, "OTP challenge issued");
        Ok(request_id)
    }

    /// Verify an emailed login code and issue the token
    pub async fn verify_otp(
        &self,
        request_id: &str,
        code: &str,
        device_id: Option<&str>,
        trust_device: bool,
    ) -> AppResult<(String, User)> {
        let expired = || AppError::Authentication("Verification code is invalid or has expired".to_string());

        let challenge = self.redis.get_otp_challenge(request_id).await?.ok_or_else(expired)?;

        let attempts = self
            .redis
            .record_otp_attempt(request_id, self.config.otp_ttl_minutes * 60)
            .await?;
        if attempts > self.config.otp_max_attempts {
            self.redis.consume_otp_challenge(request_id).await?;
            tracing::warn!(user_id = challenge.user_id, "OTP challenge discarded after too many attempts");
            return Err(expired());
        }

        if !verify_secret(code.trim(), &challenge.code_hash)? {
            tracing::info!(user_id = challenge.user_id, attempts, "Wrong OTP code");
            return Err(AppError::Authentication("Invalid verification code".to_string()));
        }

        self.redis.consume_otp_challenge(request_id).await?;

        let user = self.repository.users.get_by_id(challenge.user_id).await?;
        if user.status == UserStatus::Blocked {
            return Err(AppError::Authentication("Account is blocked".to_string()));
        }

        if trust_device {
            match device_id.filter(|d| !d.trim().is_empty()) {
                Some(device) => {
                    self.redis
                        .store_trusted_device(user.id, device, self.config.trusted_device_days * 24 * 3600)
                        .await?;
                    tracing::info!(user_id = user.id, "Device marked as trusted");
                }
                None => tracing::debug!(user_id = user.id, "trust_device requested without device id"),
            }
        }

        let token = self.issue_token(&user)?;
        tracing::info!(user_id = user.id, role = %user.role, "User logged in with OTP");
        Ok((token, user))
    }

    /// Confirm an email address from the emailed link
    pub async fn verify_email(&self, token: &str) -> AppResult<User> {
        let user = self
            .repository
            .users
            .get_by_verification_token(token)
            .await?
            .ok_or_else(|| AppError::NotFound("Verification link is invalid".to_string()))?;

        self.repository.users.mark_email_verified(user.id).await?;
        tracing::info!(user_id = user.id, "Email address verified");

        self.repository.users.get_by_id(user.id).await
    }

    /// Resend the verification email on request. Returns whether a mail was sent.
    pub async fn resend_verification(&self, email: &str) -> AppResult<bool> {
        let user = self
            .repository
            .users
            .get_by_email(email.trim())
            .await?
            .ok_or_else(|| AppError::NotFound("No account with this email".to_string()))?;

        if user.email_verified {
            return Err(AppError::InvalidState("Email is already verified".to_string()));
        }

        self.resend_verification_if_due(&user).await
    }

    async fn resend_verification_if_due(&self, user: &User) -> AppResult<bool> {
        let now = Utc::now();
        let token = user
            .verification_token
            .clone()
            .unwrap_or_else(generate_verification_token);

        if !self.verification_mail().send_if_due(user, &token, now).await? {
            return Ok(false);
        }
        self.repository.users.set_verification(user.id, &token, now).await?;

        tracing::info!(user_id = user.id, "Verification email resent");
        Ok(true)
    }

    pub async fn me(&self, user_id: i32) -> AppResult<User> {
        self.repository.users.get_by_id(user_id).await
    }

    fn verification_mail(&self) -> VerificationMail<'_> {
        VerificationMail::new(self.mailer.as_ref(), &self.config)
    }

    /// Create JWT token for a user
    fn issue_token(&self, user: &User) -> AppResult<String> {
        let now = Utc::now().timestamp();
        let claims = UserClaims {
            sub: user.email.clone(),
            user_id: user.id,
            role: user.role,
            exp: now + (self.config.jwt_expiration_hours as i64 * 3600),
            iat: now,
        };

        claims
            .create_token(&self.config.jwt_secret)
            .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::email::MockMailer;
    use mockall::predicate::{always, eq};

    #[test]
    fn test_login_gate() {
        use LoginStep::*;
        assert_eq!(login_step(Role::Customer, false, false), VerificationRequired);
        assert_eq!(login_step(Role::Customer, false, true), VerificationRequired);
        assert_eq!(login_step(Role::Customer, true, false), IssueToken);
        assert_eq!(login_step(Role::Admin, false, false), OtpRequired);
        assert_eq!(login_step(Role::StaffStation, true, false), OtpRequired);
        assert_eq!(login_step(Role::StaffStation, true, true), IssueToken);
        assert_eq!(login_step(Role::Admin, false, true), IssueToken);
    }

    #[test]
    fn test_verification_resend_throttle() {
        let now = Utc::now();
        assert!(verification_resend_due(None, now, 30));
        assert!(!verification_resend_due(Some(now - Duration::minutes(10)), now, 30));
        assert!(verification_resend_due(Some(now - Duration::minutes(30)), now, 30));
        assert!(verification_resend_due(Some(now - Duration::hours(5)), now, 30));
    }

    #[test]
    fn test_otp_format() {
        for _ in 0..50 {
            let code = generate_otp();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_secret_hash_roundtrip() {
        let hash = hash_secret("123456").unwrap();
        assert_ne!(hash, "123456");
        assert!(verify_secret("123456", &hash).unwrap());
        assert!(!verify_secret("654321", &hash).unwrap());
    }

    #[test]
    fn test_verification_token_is_url_safe() {
        let token = generate_verification_token();
        assert_eq!(token.len(), 43);
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    fn unverified_customer(verification_sent_at: Option<DateTime<Utc>>) -> User {
        let now = Utc::now();
        User {
            id: 12,
            email: "renter@evrental.vn".to_string(),
            password: String::new(),
            full_name: "Tran Thi Renter".to_string(),
            phone: None,
            identity_number: None,
            role: Role::Customer,
            station_id: None,
            email_verified: false,
            verification_token: Some("tok".to_string()),
            verification_sent_at,
            status: UserStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_verification_mail_skipped_inside_resend_window() {
        let mut mailer = MockMailer::new();
        mailer.expect_send_verification().times(0);
        mailer.expect_send_otp_code().times(0);

        let config = AuthConfig::default();
        let now = Utc::now();
        let user = unverified_customer(Some(now - Duration::minutes(10)));

        let mail = VerificationMail::new(&mailer, &config);
        let sent = tokio_test::block_on(mail.send_if_due(&user, "tok", now)).unwrap();
        assert!(!sent);
    }

    #[test]
    fn test_verification_mail_sent_after_resend_window() {
        let mut mailer = MockMailer::new();
        mailer
            .expect_send_verification()
            .with(eq("renter@evrental.vn"), always())
            .times(1)
            .returning(|_, link| {
                assert!(link.ends_with("/api/Authen/verify-email?token=tok"));
                Ok(())
            });

        let config = AuthConfig::default();
        let now = Utc::now();
        let user = unverified_customer(Some(now - Duration::minutes(45)));

        let mail = VerificationMail::new(&mailer, &config);
        let sent = tokio_test::block_on(mail.send_if_due(&user, "tok", now)).unwrap();
        assert!(sent);
    }

    #[test]
    fn test_verification_mail_failure_is_reported() {
        let mut mailer = MockMailer::new();
        mailer
            .expect_send_verification()
            .times(1)
            .returning(|_, _| Err(AppError::Internal("smtp down".to_string())));

        let config = AuthConfig::default();
        let user = unverified_customer(None);

        let mail = VerificationMail::new(&mailer, &config);
        let result = tokio_test::block_on(mail.send_if_due(&user, "tok", Utc::now()));
        assert!(matches!(result, Err(AppError::Internal(_))));
    }

    #[test]
    fn test_unknown_user_hash_is_usable() {
        let hash = UNKNOWN_USER_HASH.as_deref().unwrap();
        assert!(!verify_secret("secret123", hash).unwrap());
    }
}
