//! Redis service for login challenges and trusted devices

use redis::{AsyncCommands, Client};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{AppError, AppResult};

/// Pending OTP login, stored under `otp:{request_id}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OtpChallenge {
    pub user_id: i32,
    /// Argon2 hash of the emailed code
    pub code_hash: String,
}

#[derive(Clone)]
pub struct RedisService {
    client: Client,
}

impl RedisService {
    /// Create a new Redis service
    pub async fn new(url: &str) -> AppResult<Self> {
        let client = Client::open(url)
            .map_err(|e| AppError::Internal(format!("Failed to create Redis client: {}", e)))?;

        // Test connection
        let mut conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to connect to Redis: {}", e)))?;

        redis::cmd("PING")
            .query_async::<_, String>(&mut conn)
            .await
            .map_err(|e| AppError::Internal(format!("Redis connection test failed: {}", e)))?;

        Ok(Self { client })
    }

    async fn connection(&self) -> AppResult<redis::aio::MultiplexedConnection> {
        Ok(self.client.get_multiplexed_async_connection().await?)
    }

    /// Store an OTP challenge with expiration (in seconds)
    pub async fn store_otp_challenge(
        &self,
        request_id: &str,
        challenge: &OtpChallenge,
        expiration_seconds: u64,
    ) -> AppResult<()> {
        let payload = serde_json::to_string(challenge)
            .map_err(|e| AppError::Internal(format!("Failed to serialize OTP challenge: {}", e)))?;
        let mut conn = self.connection().await?;
        conn.set_ex::<_, _, ()>(otp_key(request_id), payload, expiration_seconds)
            .await?;
        Ok(())
    }

    pub async fn get_otp_challenge(&self, request_id: &str) -> AppResult<Option<OtpChallenge>> {
        let mut conn = self.connection().await?;
        let payload: Option<String> = conn.get(otp_key(request_id)).await?;
        payload
            .map(|raw| {
                serde_json::from_str(&raw)
                    .map_err(|e| AppError::Internal(format!("Corrupted OTP challenge: {}", e)))
            })
            .transpose()
    }

    /// Count a verification attempt; returns the number of attempts so far
    pub async fn record_otp_attempt(&self, request_id: &str, expiration_seconds: u64) -> AppResult<u32> {
        let mut conn = self.connection().await?;
        let key = otp_attempts_key(request_id);
        let attempts: u32 = conn.incr(&key, 1u32).await?;
        if attempts == 1 {
            conn.expire::<_, ()>(&key, expiration_seconds as i64).await?;
        }
        Ok(attempts)
    }

    /// Remove a challenge and its attempt counter (one-time use)
    pub async fn consume_otp_challenge(&self, request_id: &str) -> AppResult<()> {
        let mut conn = self.connection().await?;
        conn.del::<_, ()>(&[otp_key(request_id), otp_attempts_key(request_id)])
            .await?;
        Ok(())
    }

    /// Store a trusted device for a user
    pub async fn store_trusted_device(&self, user_id: i32, device_id: &str, expiration_seconds: u64) -> AppResult<()> {
        let mut conn = self.connection().await?;
        conn.set_ex::<_, _, ()>(trusted_device_key(user_id, device_id), "1", expiration_seconds)
            .await?;
        Ok(())
    }

    /// Check if a device is trusted for a user
    pub async fn is_device_trusted(&self, user_id: i32, device_id: &str) -> AppResult<bool> {
        let mut conn = self.connection().await?;
        let exists: bool = conn.exists(trusted_device_key(user_id, device_id)).await?;
        Ok(exists)
    }

    /// Readiness probe
    pub async fn ping(&self) -> AppResult<()> {
        let mut conn = self.connection().await?;
        redis::cmd("PING").query_async::<_, String>(&mut conn).await?;
        Ok(())
    }
}

fn otp_key(request_id: &str) -> String {
    format!("otp:{}", request_id)
}

fn otp_attempts_key(request_id: &str) -> String {
    format!("otp_attempts:{}", request_id)
}

/// Raw device ids never reach Redis
fn trusted_device_key(user_id: i32, device_id: &str) -> String {
    let digest = Sha256::digest(device_id.trim().as_bytes());
    format!("trusted_device:{}:{}", user_id, hex::encode(digest))
}
