use axum::{
    Json,
    extract::{Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde::Deserialize;

use crate::{
    access::{self, Role},
    calendar::CalendarState,
    cookies,
    guard::RenderGuard,
    identity::IdentityState,
    models::{
        CalendarEvent, PasswordResetRequest, RoleResponse, SignInRequest, SignInResponse,
        SignUpRequest, SignUpResponse, UpdatePasswordRequest,
    },
    config::AppConfig,
};

/// Default and maximum number of events returned by the calendar endpoint.
const DEFAULT_EVENT_LIMIT: u32 = 10;
const MAX_EVENT_LIMIT: u32 = 50;

/// EventsQuery
///
/// Accepted query parameters for GET /api/calendar/events.
#[derive(Deserialize, utoipa::IntoParams)]
pub struct EventsQuery {
    /// Maximum number of events (1 to 50, default 10).
    pub limit: Option<u32>,
}

// --- Account Handlers ---

/// sign_in
///
/// [Public Route] Password sign-in through the identity service.
///
/// Writes the session cookie and the role mirror: `administrateur=true` for
/// administrators, cleared for everyone else so a stale mirror from an earlier
/// sign-in never survives.
#[utoipa::path(
    post,
    path = "/api/auth/signin",
    request_body = SignInRequest,
    responses(
        (status = 200, description = "Signed in", body = SignInResponse),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn sign_in(
    State(identity): State<IdentityState>,
    State(config): State<AppConfig>,
    Json(payload): Json<SignInRequest>,
) -> Result<Response, StatusCode> {
    let grant = identity
        .sign_in(&payload.email, &payload.password)
        .await
        .map_err(|e| {
            tracing::info!(error = %e, "sign-in refused");
            e.status_code()
        })?;

    let role = Role::from_principal(Some(&grant.principal));
    let secure = config.secure_cookies();
    let session_cookie =
        cookies::set_session(&grant.session.access_token, grant.expires_in, secure)
            .ok_or(StatusCode::BAD_GATEWAY)?;
    let mirror_cookie = match role {
        Role::Administrator => cookies::set_role_mirror(grant.expires_in, secure),
        _ => cookies::clear_role_mirror(secure),
    };

    let mut headers = HeaderMap::new();
    headers.append(header::SET_COOKIE, session_cookie);
    headers.append(header::SET_COOKIE, mirror_cookie);

    tracing::info!(user_id = %grant.principal.id, role = role.as_str(), "signed in");

    let body = SignInResponse {
        role,
        redirect_to: access::landing_for(role),
    };
    Ok((headers, Json(body)).into_response())
}

/// sign_up
///
/// [Public Route] Creates an account with the identity service. The password is
/// forwarded and never stored or logged.
#[utoipa::path(
    post,
    path = "/api/auth/signup",
    request_body = SignUpRequest,
    responses(
        (status = 201, description = "Account created", body = SignUpResponse),
        (status = 400, description = "Rejected by the identity service")
    )
)]
pub async fn sign_up(
    State(identity): State<IdentityState>,
    Json(payload): Json<SignUpRequest>,
) -> Result<(StatusCode, Json<SignUpResponse>), StatusCode> {
    let principal = identity
        .sign_up(&payload.email, &payload.password)
        .await
        .map_err(|e| {
            tracing::info!(error = %e, "sign-up refused");
            e.status_code()
        })?;

    Ok((
        StatusCode::CREATED,
        Json(SignUpResponse {
            id: principal.id,
            email: principal.email,
        }),
    ))
}

/// request_password_reset
///
/// [Public Route] Asks the identity service to email a reset link that brings the
/// user back to the reset page.
#[utoipa::path(
    post,
    path = "/api/auth/reset",
    request_body = PasswordResetRequest,
    responses((status = 202, description = "Reset email requested"))
)]
pub async fn request_password_reset(
    State(identity): State<IdentityState>,
    State(config): State<AppConfig>,
    Json(payload): Json<PasswordResetRequest>,
) -> StatusCode {
    match identity
        .send_password_reset(&payload.email, &config.password_reset_redirect)
        .await
    {
        Ok(()) => StatusCode::ACCEPTED,
        Err(e) => {
            tracing::warn!(error = %e, "password reset request failed");
            e.status_code()
        }
    }
}

/// update_password
///
/// [Authenticated Route] Sets a new password for the session in the cookie (the reset
/// link signs the user in before landing on the reset page).
#[utoipa::path(
    post,
    path = "/api/auth/password",
    request_body = UpdatePasswordRequest,
    responses(
        (status = 204, description = "Password updated"),
        (status = 401, description = "No active session")
    )
)]
pub async fn update_password(
    State(identity): State<IdentityState>,
    headers: HeaderMap,
    Json(payload): Json<UpdatePasswordRequest>,
) -> StatusCode {
    let token = cookies::session_token(&headers);
    let session = match identity.get_session(token.as_deref()).await {
        Ok(Some(session)) => session,
        Ok(None) => return StatusCode::UNAUTHORIZED,
        Err(e) => return e.status_code(),
    };

    match identity.update_password(&session, &payload.password).await {
        Ok(()) => StatusCode::NO_CONTENT,
        Err(e) => {
            tracing::warn!(user_id = %session.user_id, error = %e, "password update failed");
            e.status_code()
        }
    }
}

/// sign_out
///
/// [Public Route] Revokes the session (best effort) and clears both cookies. The
/// cookies are cleared even if the identity service cannot be reached.
#[utoipa::path(
    post,
    path = "/api/auth/signout",
    responses((status = 204, description = "Signed out"))
)]
pub async fn sign_out(
    State(identity): State<IdentityState>,
    State(config): State<AppConfig>,
    headers: HeaderMap,
) -> Response {
    let token = cookies::session_token(&headers);
    if let Ok(Some(session)) = identity.get_session(token.as_deref()).await {
        if let Err(e) = identity.sign_out(&session).await {
            tracing::warn!(user_id = %session.user_id, error = %e, "session revocation failed");
        }
    }

    let mut response_headers = HeaderMap::new();
    let secure = config.secure_cookies();
    response_headers.append(header::SET_COOKIE, cookies::clear_session(secure));
    response_headers.append(header::SET_COOKIE, cookies::clear_role_mirror(secure));
    (StatusCode::NO_CONTENT, response_headers).into_response()
}

/// get_my_role
///
/// [Public Route] The caller's authoritative role, resolved through the same guard
/// path the protected pages use. Anything that cannot be resolved is `anonymous`.
#[utoipa::path(
    get,
    path = "/api/me/role",
    responses((status = 200, description = "Resolved role", body = RoleResponse))
)]
pub async fn get_my_role(State(guard): State<RenderGuard>, headers: HeaderMap) -> Json<RoleResponse> {
    let token = cookies::session_token(&headers);
    let role = match guard.resolve_principal(token.as_deref()).await {
        Ok(principal) => Role::from_principal(Some(&principal)),
        Err(e) => {
            tracing::debug!(error = %e, "role resolution failed");
            Role::Anonymous
        }
    };
    Json(RoleResponse { role })
}

// --- Calendar ---

/// get_calendar_events
///
/// [Public Route] Upcoming club events from the external calendar.
#[utoipa::path(
    get,
    path = "/api/calendar/events",
    params(EventsQuery),
    responses(
        (status = 200, description = "Upcoming events", body = [CalendarEvent]),
        (status = 502, description = "Calendar unavailable")
    )
)]
pub async fn get_calendar_events(
    State(calendar): State<CalendarState>,
    Query(query): Query<EventsQuery>,
) -> Result<Json<Vec<CalendarEvent>>, StatusCode> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_EVENT_LIMIT)
        .clamp(1, MAX_EVENT_LIMIT);

    calendar
        .upcoming_events(Utc::now(), limit)
        .await
        .map(Json)
        .map_err(|e| {
            tracing::warn!(error = %e, "calendar unavailable");
            StatusCode::BAD_GATEWAY
        })
}
