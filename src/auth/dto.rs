use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::repo::User;

/// Request body for signup. `password_confirm` is transient input: it is
/// compared against `password` at the edge and never persisted.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub user_name: String,
    pub email: String,
    pub password: String,
    pub password_confirm: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub otp: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ForgetPasswordRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub email: String,
    pub otp: String,
    pub password: String,
    pub password_confirm: String,
}

/// Success envelope: `{status, message, token?, data: {user}?}`.
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub status: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<UserData>,
}

impl SuccessResponse {
    pub fn message_only(message: &str) -> Self {
        Self {
            status: "success",
            message: message.to_string(),
            token: None,
            data: None,
        }
    }

    pub fn with_token(message: &str, token: String, user: PublicUser) -> Self {
        Self {
            status: "success",
            message: message.to_string(),
            token: Some(token),
            data: Some(UserData { user }),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserData {
    pub user: PublicUser,
}

/// Public projection of a user; never carries the hash or OTP fields.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: Uuid,
    pub user_name: String,
    pub email: String,
    pub is_verified: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            user_name: user.user_name.clone(),
            email: user.email.clone(),
            is_verified: user.is_verified,
            created_at: user.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signup_request_uses_camel_case() {
        let payload: SignupRequest = serde_json::from_str(
            r#"{"email":"a@x.com","password":"longenough1","passwordConfirm":"longenough1","userName":"abc"}"#,
        )
        .unwrap();
        assert_eq!(payload.user_name, "abc");
        assert_eq!(payload.password_confirm, "longenough1");
    }

    #[test]
    fn public_user_serializes_camel_case_without_secrets() {
        let public = PublicUser {
            id: Uuid::new_v4(),
            user_name: "abc".into(),
            email: "a@x.com".into(),
            is_verified: false,
            created_at: OffsetDateTime::now_utc(),
        };
        let json = serde_json::to_value(&public).unwrap();
        assert_eq!(json["userName"], "abc");
        assert_eq!(json["isVerified"], false);
        assert!(json.get("passwordHash").is_none());
        assert!(json.get("password_hash").is_none());
    }

    #[test]
    fn envelope_omits_absent_token_and_data() {
        let body = SuccessResponse::message_only("Logged out successfully.");
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["status"], "success");
        assert!(json.get("token").is_none());
        assert!(json.get("data").is_none());
    }

    #[test]
    fn envelope_nests_user_under_data() {
        let public = PublicUser {
            id: Uuid::new_v4(),
            user_name: "abc".into(),
            email: "a@x.com".into(),
            is_verified: true,
            created_at: OffsetDateTime::now_utc(),
        };
        let body = SuccessResponse::with_token(
            "Login successful.",
            "jwt-token".into(),
            public,
        );
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["token"], "jwt-token");
        assert_eq!(json["data"]["user"]["email"], "a@x.com");
        assert_eq!(json["data"]["user"]["isVerified"], true);
    }
}
