use crate::{AppState, handlers, pages};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Site pages anyone can see, plus the account endpoints that forward to the identity
/// service and the read-only calendar feed.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for the load balancer.
        .route("/health", get(|| async { "ok" }))
        // --- Pages ---
        .route("/", get(pages::home))
        .route("/calendar", get(pages::calendar_page))
        .route("/login", get(pages::login_page))
        .route("/signup", get(pages::signup_page))
        .route("/reset-password", get(pages::reset_password_page))
        // Canonical destination for "signed in, wrong role".
        .route("/unauthorized", get(pages::unauthorized_page))
        // --- Account API ---
        // POST /api/auth/signin
        // Sets the session cookie and the role mirror.
        .route("/api/auth/signin", post(handlers::sign_in))
        .route("/api/auth/signup", post(handlers::sign_up))
        .route("/api/auth/reset", post(handlers::request_password_reset))
        // POST /api/auth/password
        // Needs the session cookie; the handler checks it against the identity service.
        .route("/api/auth/password", post(handlers::update_password))
        // POST /api/auth/signout
        // Clears both cookies.
        .route("/api/auth/signout", post(handlers::sign_out))
        .route("/api/me/role", get(handlers::get_my_role))
        // --- Calendar API ---
        .route("/api/calendar/events", get(handlers::get_calendar_events))
}
