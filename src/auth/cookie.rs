use axum::http::{
    header::{InvalidHeaderValue, AUTHORIZATION, COOKIE},
    HeaderMap, HeaderValue,
};

use crate::config::CookieConfig;

pub const TOKEN_COOKIE_NAME: &str = "token";

/// Value written over the cookie on logout. The token itself stays valid
/// until natural expiry; this only expires it client-side.
pub const LOGOUT_SENTINEL: &str = "loggedout";
const LOGOUT_MAX_AGE_SECS: i64 = 10;

/// Build the `Set-Cookie` value carrying a freshly issued bearer token.
pub fn bearer_cookie(config: &CookieConfig, token: &str) -> Result<HeaderValue, InvalidHeaderValue> {
    let max_age = config.expires_days * 24 * 60 * 60;
    let mut cookie =
        format!("{TOKEN_COOKIE_NAME}={token}; Path=/; HttpOnly; Max-Age={max_age}");
    if config.cross_site {
        cookie.push_str("; Secure; SameSite=None");
    } else {
        cookie.push_str("; SameSite=Lax");
    }
    HeaderValue::from_str(&cookie)
}

/// Overwrite the bearer cookie with a short-lived sentinel.
pub fn logout_cookie(config: &CookieConfig) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie = format!(
        "{TOKEN_COOKIE_NAME}={LOGOUT_SENTINEL}; Path=/; HttpOnly; Max-Age={LOGOUT_MAX_AGE_SECS}"
    );
    if config.cross_site {
        cookie.push_str("; Secure; SameSite=None");
    } else {
        cookie.push_str("; SameSite=Lax");
    }
    HeaderValue::from_str(&cookie)
}

/// Pull the bearer token from the `token` cookie, falling back to an
/// `Authorization: Bearer` header.
pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    if let Some(token) = extract_cookie_token(headers) {
        return Some(token);
    }
    extract_bearer_header(headers)
}

fn extract_cookie_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(COOKIE)?.to_str().ok()?;
    for pair in value.split(';') {
        let mut parts = pair.trim().splitn(2, '=');
        let key = parts.next()?.trim();
        let val = parts.next()?.trim();
        if key == TOKEN_COOKIE_NAME && !val.is_empty() && val != LOGOUT_SENTINEL {
            return Some(val.to_string());
        }
    }
    None
}

fn extract_bearer_header(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value
        .trim()
        .strip_prefix("Bearer ")
        .or_else(|| value.trim().strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}
