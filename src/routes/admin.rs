use crate::{AppState, pages};
use axum::{Router, routing::get};

/// Admin Router Module
///
/// Pages reserved for administrators, nested under `/admin`.
///
/// Access Control:
/// Two independent checks run in order. The route interceptor rejects any request
/// whose role mirror is not exactly `"true"` before routing reaches this module; the
/// page's Render Guard then re-validates the administrator claim with the identity
/// service, since the mirror can be stale.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET /admin/dashboard
        .route("/dashboard", get(pages::admin_dashboard))
}
