use axum::{
    extract::FromRef,
    http::HeaderName,
    Router,
    middleware,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Access gate: shared role resolution, cookie mirror, request-time and render-time checks.
pub mod access;
pub mod cookies;
pub mod guard;
pub mod interceptor;

// Collaborators behind traits, injected through the application state.
pub mod calendar;
pub mod identity;

pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod pages;
pub mod retry;
pub mod ui;

// Module for routing segregation (Public, Member, Admin).
pub mod routes;
use routes::{admin, member, public};

// --- Public Re-exports ---

pub use calendar::{CalendarState, GoogleCalendarClient, MockCalendarService};
pub use access::RouteTable;
pub use config::AppConfig;
pub use guard::RenderGuard;
pub use identity::{IdentityState, MockIdentityService, SupabaseIdentity};

/// ApiDoc
///
/// OpenAPI document for the JSON endpoints, served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::sign_in, handlers::sign_up, handlers::request_password_reset,
        handlers::update_password, handlers::sign_out, handlers::get_my_role,
        handlers::get_calendar_events
    ),
    components(
        schemas(
            models::SignInRequest, models::SignInResponse, models::SignUpRequest,
            models::SignUpResponse, models::PasswordResetRequest, models::UpdatePasswordRequest,
            models::RoleResponse, models::CalendarEvent, models::Principal, models::RoleClaims,
            access::Role, access::Destination,
        )
    ),
    tags(
        (name = "club-portal", description = "Club website API")
    )
)]
struct ApiDoc;

/// AppState
///
/// The single container of everything requests share. Collaborators are explicit,
/// constructed once and injected here, so tests can swap in fakes.
#[derive(Clone)]
pub struct AppState {
    /// Identity boundary (sessions, principals, account operations).
    pub identity: IdentityState,
    /// External calendar feed.
    pub calendar: CalendarState,
    /// Render Guard built on the same identity boundary.
    pub guard: RenderGuard,
    /// The loaded, immutable configuration.
    pub config: AppConfig,
}

impl AppState {
    pub fn new(config: AppConfig, identity: IdentityState, calendar: CalendarState) -> Self {
        let guard = RenderGuard::new(identity.clone(), config.guard.clone());
        Self {
            identity,
            calendar,
            guard,
            config,
        }
    }
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for IdentityState {
    fn from_ref(app_state: &AppState) -> IdentityState {
        app_state.identity.clone()
    }
}

impl FromRef<AppState> for CalendarState {
    fn from_ref(app_state: &AppState) -> CalendarState {
        app_state.calendar.clone()
    }
}

impl FromRef<AppState> for RenderGuard {
    fn from_ref(app_state: &AppState) -> RenderGuard {
        app_state.guard.clone()
    }
}

impl FromRef<AppState> for RouteTable {
    fn from_ref(app_state: &AppState) -> RouteTable {
        app_state.config.route_table.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// create_router
///
/// Assembles the routes, puts the route interceptor in front of every one of them,
/// and adds the observability layers.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(member::member_routes())
        .nest("/admin", admin::admin_routes())
        // The interceptor wraps routing itself, so a rejected request never reaches
        // a handler (or its Render Guard).
        .layer(middleware::from_fn_with_state(
            state.clone(),
            interceptor::route_interceptor,
        ))
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Span for every request, keyed by the `x-request-id` header so all log lines of a
/// request correlate. Cookies are never recorded.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        path = %request.uri().path(),
        req_id = %request_id,
    )
}
