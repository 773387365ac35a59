use axum::{
    routing::{get, post},
    Router,
};

use crate::state::AppState;

mod dto;
pub mod handlers;
pub mod password;
pub mod policy;
pub mod repo;
pub mod session;

pub fn router() -> Router<AppState> {
    // The bare paths are aliases kept for older frontend builds.
    Router::new()
        .route("/send-signup-otp", post(handlers::send_signup_otp))
        .route("/auth/signup", post(handlers::signup))
        .route("/signup", post(handlers::signup))
        .route("/auth/login", post(handlers::login))
        .route("/login", post(handlers::login))
        .route("/auth/logout", post(handlers::logout))
        .route("/logout", post(handlers::logout))
        .route("/auth/me", get(handlers::me))
        .route("/me", get(handlers::me))
}
