use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

/// User record in the database.
///
/// The OTP columns come in pairs (code + expiry) that are always written
/// together; a half-set pair never exists.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub user_name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub is_verified: bool,
    #[serde(skip_serializing)]
    pub verification_otp: Option<String>,
    #[serde(skip_serializing)]
    pub verification_otp_expires_at: Option<OffsetDateTime>,
    #[serde(skip_serializing)]
    pub reset_otp: Option<String>,
    #[serde(skip_serializing)]
    pub reset_otp_expires_at: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

const USER_COLUMNS: &str = "id, user_name, email, password_hash, is_verified, \
     verification_otp, verification_otp_expires_at, \
     reset_otp, reset_otp_expires_at, created_at, updated_at";

impl User {
    pub async fn find_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Create an unverified user with a fresh verification OTP pair.
    pub async fn create(
        db: &PgPool,
        user_name: &str,
        email: &str,
        password_hash: &str,
        verification_otp: &str,
        verification_otp_expires_at: OffsetDateTime,
    ) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users \
                 (user_name, email, password_hash, verification_otp, verification_otp_expires_at) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(user_name)
        .bind(email)
        .bind(password_hash)
        .bind(verification_otp)
        .bind(verification_otp_expires_at)
        .fetch_one(db)
        .await?;
        Ok(user)
    }

    /// Signup rollback: the account is not considered created until its OTP
    /// email went out.
    pub async fn delete(db: &PgPool, id: Uuid) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(())
    }

    pub async fn set_verification_otp(
        db: &PgPool,
        id: Uuid,
        code: &str,
        expires_at: OffsetDateTime,
    ) -> anyhow::Result<()> {
        sqlx::query(
            "UPDATE users \
             SET verification_otp = $2, verification_otp_expires_at = $3, updated_at = now() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(code)
        .bind(expires_at)
        .execute(db)
        .await?;
        Ok(())
    }

    /// Roll the verification pair back to NULL after a failed mail delivery.
    pub async fn clear_verification_otp(db: &PgPool, id: Uuid) -> anyhow::Result<()> {
        sqlx::query(
            "UPDATE users \
             SET verification_otp = NULL, verification_otp_expires_at = NULL, updated_at = now() \
             WHERE id = $1",
        )
        .bind(id)
        .execute(db)
        .await?;
        Ok(())
    }

    /// Consume the verification OTP: flip the verified flag and clear the
    /// pair in one statement.
    pub async fn mark_verified(db: &PgPool, id: Uuid) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users \
             SET is_verified = TRUE, \
                 verification_otp = NULL, verification_otp_expires_at = NULL, \
                 updated_at = now() \
             WHERE id = $1 \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .fetch_one(db)
        .await?;
        Ok(user)
    }

    pub async fn set_reset_otp(
        db: &PgPool,
        id: Uuid,
        code: &str,
        expires_at: OffsetDateTime,
    ) -> anyhow::Result<()> {
        sqlx::query(
            "UPDATE users \
             SET reset_otp = $2, reset_otp_expires_at = $3, updated_at = now() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(code)
        .bind(expires_at)
        .execute(db)
        .await?;
        Ok(())
    }

    /// Roll the reset pair back to NULL after a failed mail delivery.
    pub async fn clear_reset_otp(db: &PgPool, id: Uuid) -> anyhow::Result<()> {
        sqlx::query(
            "UPDATE users \
             SET reset_otp = NULL, reset_otp_expires_at = NULL, updated_at = now() \
             WHERE id = $1",
        )
        .bind(id)
        .execute(db)
        .await?;
        Ok(())
    }

    /// Atomically consume a reset OTP and overwrite the password.
    ///
    /// Email, code and expiry are checked in the row predicate of a single
    /// conditional UPDATE, so at most one concurrent consumption can succeed
    /// and a failed lookup does not reveal which condition missed.
    pub async fn consume_reset_otp(
        db: &PgPool,
        email: &str,
        code: &str,
        new_password_hash: &str,
    ) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users \
             SET password_hash = $3, \
                 reset_otp = NULL, reset_otp_expires_at = NULL, \
                 updated_at = now() \
             WHERE email = $1 \
               AND reset_otp = $2 \
               AND reset_otp_expires_at > now() \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(email)
        .bind(code)
        .bind(new_password_hash)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }
}
