use axum::{routing::post, Router};

use crate::state::AppState;

pub mod cookie;
pub mod dto;
pub mod extractors;
pub mod handlers;
pub mod jwt;
pub mod otp;
pub mod password;
pub mod repo;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/signup", post(handlers::signup))
        .route("/verify", post(handlers::verify_account))
        .route("/resend-otp", post(handlers::resend_otp))
        .route("/login", post(handlers::login))
        .route("/logout", post(handlers::logout))
        .route("/forget-password", post(handlers::forget_password))
        .route("/reset-password", post(handlers::reset_password))
}
