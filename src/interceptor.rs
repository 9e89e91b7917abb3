use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};

use crate::{
    AppState,
    access::{self, Decision, Role, RouteClass},
    cookies,
};

/// route_interceptor
///
/// Request-time access check, run before any page handler. Decides from the role
/// mirror cookie alone: no I/O, no cookie writes.
///
/// Only `AdminOnly` paths are checked. For them anything other than a mirror value of
/// exactly `"true"` redirects to the canonical unauthorized page and the handler is
/// never invoked. Every other path is forwarded untouched, whatever its cookies.
///
/// `MemberOnly` pages are not intercepted here; only the Render Guard covers them.
pub async fn route_interceptor(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path();
    let class = state.config.route_table.classify(path);

    if class != RouteClass::AdminOnly {
        return next.run(request).await;
    }

    let mirror = cookies::role_mirror(request.headers());
    let role = Role::from_cookie(mirror.as_deref());

    match access::decide(class, role) {
        Decision::Allow => {
            tracing::debug!(path, role = role.as_str(), "interceptor forwarded admin request");
            next.run(request).await
        }
        Decision::Redirect(destination) => {
            tracing::info!(
                path,
                role = role.as_str(),
                destination = destination.path(),
                "interceptor rejected admin request",
            );
            Redirect::to(destination.path()).into_response()
        }
    }
}
