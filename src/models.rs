use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::access::{Destination, Role};

// --- Identity Records (owned by the external identity service) ---

/// Session
///
/// An active login, as established from the access token carried in the session cookie.
/// The token itself is only ever forwarded to the identity service, never logged.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub access_token: String,
    // The `sub` claim of the token.
    pub user_id: Uuid,
    // Unix timestamp (seconds) after which the identity service rejects the token.
    pub expires_at: i64,
}

/// RoleClaims
///
/// The claims bag of a principal. Only the administrator flag drives access decisions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct RoleClaims {
    #[serde(default)]
    pub administrator: bool,
}

/// Principal
///
/// The authenticated entity returned by the identity service's user endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct Principal {
    pub id: Uuid,
    pub email: String,
    pub claims: RoleClaims,
}

/// SignInGrant
///
/// Result of a successful password sign-in: a fresh session and the principal it
/// belongs to, so the role mirror can be written without a second round trip.
#[derive(Debug, Clone)]
pub struct SignInGrant {
    pub session: Session,
    // Lifetime of the access token in seconds; also used as the cookies' Max-Age.
    pub expires_in: i64,
    pub principal: Principal,
}

// --- Request Payloads ---

/// SignInRequest
///
/// Input payload for POST /api/auth/signin.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

/// SignUpRequest
///
/// Input payload for POST /api/auth/signup. The password is passed through to the
/// identity service and never persisted or logged here.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
}

/// PasswordResetRequest
///
/// Input payload for POST /api/auth/reset.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct PasswordResetRequest {
    pub email: String,
}

/// UpdatePasswordRequest
///
/// Input payload for POST /api/auth/password, sent from the page the reset email links to.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct UpdatePasswordRequest {
    pub password: String,
}

// --- Response Schemas ---

/// SignInResponse
///
/// Tells the front end which role was resolved and where to land.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct SignInResponse {
    pub role: Role,
    pub redirect_to: Destination,
}

/// SignUpResponse
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct SignUpResponse {
    pub id: Uuid,
    pub email: String,
}

/// RoleResponse
///
/// Output of GET /api/me/role, resolved against the identity service.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct RoleResponse {
    pub role: Role,
}

/// CalendarEvent
///
/// One upcoming event of the club calendar. `start`/`end` are RFC 3339 date-times,
/// or plain dates for all-day events, exactly as the calendar API reports them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct CalendarEvent {
    pub id: String,
    pub summary: String,
    pub start: String,
    pub end: String,
    pub location: Option<String>,
    pub all_day: bool,
}
