use axum::{
    extract::{FromRef, State},
    http::{header::SET_COOKIE, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use lazy_static::lazy_static;
use regex::Regex;
use time::OffsetDateTime;
use tracing::{error, info, instrument, warn};

use crate::{
    auth::{
        cookie,
        dto::{
            ForgetPasswordRequest, LoginRequest, PublicUser, ResetPasswordRequest,
            SignupRequest, SuccessResponse, VerifyRequest,
        },
        extractors::CurrentUser,
        jwt::TokenKeys,
        otp, password,
        repo::User,
    },
    email::EmailMessage,
    error::{ApiError, ApiResult},
    state::AppState,
};

fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn validate_signup(payload: &SignupRequest) -> ApiResult<()> {
    if !is_valid_email(&payload.email) {
        return Err(ApiError::BadRequest(
            "Please enter a valid email address.".into(),
        ));
    }
    let name_len = payload.user_name.trim().chars().count();
    if !(3..=30).contains(&name_len) {
        return Err(ApiError::BadRequest(
            "Username must be between 3 and 30 characters.".into(),
        ));
    }
    validate_password_pair(&payload.password, &payload.password_confirm)
}

fn validate_password_pair(password: &str, password_confirm: &str) -> ApiResult<()> {
    if password.len() < 8 {
        return Err(ApiError::BadRequest(
            "Password must be at least 8 characters long.".into(),
        ));
    }
    if password != password_confirm {
        return Err(ApiError::BadRequest("Passwords must match.".into()));
    }
    Ok(())
}

/// Issue a bearer token for `user`, set it as an http-only cookie and wrap
/// the user in the success envelope.
fn token_response(state: &AppState, user: &User, message: &str) -> ApiResult<Response> {
    let keys = TokenKeys::from_ref(state);
    let token = keys.sign(user.id).map_err(|e| {
        error!(error = %e, user_id = %user.id, "token signing failed");
        ApiError::Internal("Failed to issue authentication token.".into())
    })?;
    let cookie = cookie::bearer_cookie(&state.config.cookie, &token).map_err(|e| {
        error!(error = %e, "cookie encoding failed");
        ApiError::Internal("Failed to issue authentication token.".into())
    })?;

    let mut headers = HeaderMap::new();
    headers.insert(SET_COOKIE, cookie);
    let body = SuccessResponse::with_token(message, token, PublicUser::from(user));
    Ok((StatusCode::OK, headers, Json(body)).into_response())
}

async fn send_verification_email(state: &AppState, to: &str, code: &str) -> anyhow::Result<()> {
    state
        .mailer
        .send(&EmailMessage {
            to: to.to_string(),
            subject: "OTP for email verification".into(),
            html: format!("<h1>Your OTP is: {code}</h1>"),
        })
        .await
}

async fn send_reset_email(state: &AppState, to: &str, code: &str) -> anyhow::Result<()> {
    state
        .mailer
        .send(&EmailMessage {
            to: to.to_string(),
            subject: "Password reset OTP".into(),
            html: format!("<h1>Your password reset OTP is: {code}</h1><p>It is valid for 5 minutes.</p>"),
        })
        .await
}

#[instrument(skip(state, payload))]
pub async fn signup(
    State(state): State<AppState>,
    Json(mut payload): Json<SignupRequest>,
) -> ApiResult<Response> {
    payload.email = normalize_email(&payload.email);
    validate_signup(&payload)?;

    if User::find_by_email(&state.db, &payload.email).await?.is_some() {
        warn!(email = %payload.email, "signup with already registered email");
        return Err(ApiError::BadRequest(
            "An account with this email already exists.".into(),
        ));
    }

    let hash = password::hash(&payload.password).map_err(|e| {
        error!(error = %e, "password hashing failed");
        ApiError::Internal("Failed to create account.".into())
    })?;

    let code = otp::generate();
    let expires_at = OffsetDateTime::now_utc() + otp::VERIFICATION_OTP_TTL;
    let user = User::create(
        &state.db,
        payload.user_name.trim(),
        &payload.email,
        &hash,
        &code,
        expires_at,
    )
    .await?;

    // Signup is not complete without a delivered OTP; undo on mail failure
    // so retrying with the same email works.
    if let Err(e) = send_verification_email(&state, &user.email, &code).await {
        error!(error = %e, email = %user.email, "verification email failed, deleting user");
        User::delete(&state.db, user.id).await?;
        return Err(ApiError::Internal(
            "Failed to send OTP email. Please try signing up again.".into(),
        ));
    }

    info!(user_id = %user.id, email = %user.email, "user signed up");
    token_response(&state, &user, "Registration successful. OTP sent to your email.")
}

#[instrument(skip(state, user, payload))]
pub async fn verify_account(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<VerifyRequest>,
) -> ApiResult<Response> {
    let submitted = payload
        .otp
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| {
            ApiError::BadRequest("OTP is required to verify your account.".into())
        })?;

    otp::check(
        user.verification_otp.as_deref(),
        user.verification_otp_expires_at,
        submitted,
        OffsetDateTime::now_utc(),
    )
    .map_err(|e| {
        warn!(user_id = %user.id, "verification otp rejected");
        ApiError::BadRequest(e.to_string())
    })?;

    let user = User::mark_verified(&state.db, user.id).await?;

    info!(user_id = %user.id, "email verified");
    token_response(&state, &user, "Your email has been successfully verified.")
}

#[instrument(skip(state, user))]
pub async fn resend_otp(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> ApiResult<Response> {
    if user.is_verified {
        return Err(ApiError::BadRequest(
            "This account is already verified.".into(),
        ));
    }

    let code = otp::generate();
    let expires_at = OffsetDateTime::now_utc() + otp::VERIFICATION_OTP_TTL;
    User::set_verification_otp(&state.db, user.id, &code, expires_at).await?;

    if let Err(e) = send_verification_email(&state, &user.email, &code).await {
        error!(error = %e, email = %user.email, "verification email failed, clearing otp");
        User::clear_verification_otp(&state.db, user.id).await?;
        return Err(ApiError::Internal(
            "Failed to send OTP email. Please try again later.".into(),
        ));
    }

    info!(user_id = %user.id, "verification otp resent");
    Ok((
        StatusCode::OK,
        Json(SuccessResponse::message_only(
            "A new OTP has been sent to your email.",
        )),
    )
        .into_response())
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<Response> {
    let (email, plain) = match (payload.email.as_deref(), payload.password.as_deref()) {
        (Some(email), Some(password)) if !email.is_empty() && !password.is_empty() => {
            (normalize_email(email), password)
        }
        _ => {
            return Err(ApiError::BadRequest(
                "Please provide email and password.".into(),
            ))
        }
    };

    // Unknown email and wrong password answer identically.
    let Some(user) = User::find_by_email(&state.db, &email).await? else {
        warn!(email = %email, "login with unknown email");
        return Err(ApiError::Unauthorized("Incorrect email or password.".into()));
    };

    let ok = password::verify(plain, &user.password_hash).map_err(|e| {
        error!(error = %e, user_id = %user.id, "password verification failed");
        ApiError::Internal("Failed to log in.".into())
    })?;
    if !ok {
        warn!(user_id = %user.id, "login with wrong password");
        return Err(ApiError::Unauthorized("Incorrect email or password.".into()));
    }

    info!(user_id = %user.id, "user logged in");
    token_response(&state, &user, "Login successful.")
}

#[instrument(skip(state))]
pub async fn logout(State(state): State<AppState>) -> ApiResult<Response> {
    let cookie = cookie::logout_cookie(&state.config.cookie).map_err(|e| {
        error!(error = %e, "cookie encoding failed");
        ApiError::Internal("Failed to log out.".into())
    })?;

    let mut headers = HeaderMap::new();
    headers.insert(SET_COOKIE, cookie);
    Ok((
        StatusCode::OK,
        headers,
        Json(SuccessResponse::message_only("Logged out successfully.")),
    )
        .into_response())
}

#[instrument(skip(state, payload))]
pub async fn forget_password(
    State(state): State<AppState>,
    Json(payload): Json<ForgetPasswordRequest>,
) -> ApiResult<Response> {
    let email = normalize_email(&payload.email);
    let Some(user) = User::find_by_email(&state.db, &email).await? else {
        return Err(ApiError::NotFound(
            "No user found with that email address.".into(),
        ));
    };

    let code = otp::generate();
    let expires_at = OffsetDateTime::now_utc() + otp::RESET_OTP_TTL;
    User::set_reset_otp(&state.db, user.id, &code, expires_at).await?;

    if let Err(e) = send_reset_email(&state, &user.email, &code).await {
        error!(error = %e, email = %user.email, "reset email failed, clearing otp");
        User::clear_reset_otp(&state.db, user.id).await?;
        return Err(ApiError::Internal(
            "Failed to send password reset email. Please try again later.".into(),
        ));
    }

    info!(user_id = %user.id, "password reset otp issued");
    Ok((
        StatusCode::OK,
        Json(SuccessResponse::message_only(
            "Password reset OTP has been sent to your email.",
        )),
    )
        .into_response())
}

#[instrument(skip(state, payload))]
pub async fn reset_password(
    State(state): State<AppState>,
    Json(payload): Json<ResetPasswordRequest>,
) -> ApiResult<Response> {
    let email = normalize_email(&payload.email);
    validate_password_pair(&payload.password, &payload.password_confirm)?;

    let hash = password::hash(&payload.password).map_err(|e| {
        error!(error = %e, "password hashing failed");
        ApiError::Internal("Failed to reset password.".into())
    })?;

    // One conditional update checks email, code and expiry together; a miss
    // does not say which of the three failed.
    let Some(user) =
        User::consume_reset_otp(&state.db, &email, payload.otp.trim(), &hash).await?
    else {
        warn!(email = %email, "reset otp rejected");
        return Err(ApiError::BadRequest("Invalid or expired OTP.".into()));
    };

    info!(user_id = %user.id, "password reset");
    token_response(&state, &user, "Password reset successful. You are now logged in.")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signup_payload() -> SignupRequest {
        serde_json::from_str(
            r#"{"email":"a@x.com","password":"longenough1","passwordConfirm":"longenough1","userName":"abc"}"#,
        )
        .unwrap()
    }

    #[test]
    fn valid_signup_passes_validation() {
        assert!(validate_signup(&signup_payload()).is_ok());
    }

    #[test]
    fn signup_rejects_bad_email() {
        let mut payload = signup_payload();
        payload.email = "not-an-email".into();
        let err = validate_signup(&payload).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn signup_rejects_short_password() {
        let mut payload = signup_payload();
        payload.password = "short".into();
        payload.password_confirm = "short".into();
        let err = validate_signup(&payload).unwrap_err();
        assert_eq!(err.to_string(), "Password must be at least 8 characters long.");
    }

    #[test]
    fn signup_rejects_mismatched_confirmation() {
        let mut payload = signup_payload();
        payload.password_confirm = "different1".into();
        let err = validate_signup(&payload).unwrap_err();
        assert_eq!(err.to_string(), "Passwords must match.");
    }

    #[test]
    fn signup_rejects_out_of_range_user_name() {
        let mut payload = signup_payload();
        payload.user_name = "ab".into();
        assert!(validate_signup(&payload).is_err());

        payload.user_name = "x".repeat(31);
        assert!(validate_signup(&payload).is_err());
    }

    #[test]
    fn email_format_check() {
        assert!(is_valid_email("a@x.com"));
        assert!(is_valid_email("name.surname@example.co"));
        assert!(!is_valid_email("no-at-sign"));
        assert!(!is_valid_email("spaces in@x.com"));
        assert!(!is_valid_email("a@nodot"));
    }

    #[test]
    fn email_normalization_trims_and_lowercases() {
        assert_eq!(normalize_email(" Alice@Example.COM "), "alice@example.com");
    }
}
