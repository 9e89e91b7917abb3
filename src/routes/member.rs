use crate::{AppState, pages};
use axum::{Router, routing::get};

/// Member Router Module
///
/// Pages for any authenticated principal. These paths are classified member-only but
/// the request interceptor does not look at them: the Render Guard inside each page
/// is the only check, and the page shows nothing protected until it has resolved.
pub fn member_routes() -> Router<AppState> {
    Router::new()
        // GET /dashboard/client
        // Member dashboard; also where signed-in members land.
        .route("/dashboard/client", get(pages::member_dashboard))
}
