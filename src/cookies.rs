//! Role Cookie Mirror contract.
//!
//! `administrateur` is a denormalized copy of the admin claim, written at sign-in and
//! cleared at sign-out. It lets the interceptor decide without a network call but it
//! is never authoritative: the Render Guard re-checks against the identity service.

use axum::http::{HeaderMap, HeaderValue, header};

use crate::access::ROLE_MIRROR_TRUE;

/// Name of the role mirror cookie.
pub const ROLE_COOKIE: &str = "administrateur";
/// Name of the cookie carrying the identity service access token.
pub const SESSION_COOKIE: &str = "sb-access-token";

/// Returns the value of the first cookie called `name` across all `Cookie` headers.
pub fn read(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
}

/// The role mirror as seen on a request.
pub fn role_mirror(headers: &HeaderMap) -> Option<String> {
    read(headers, ROLE_COOKIE)
}

/// The session access token as seen on a request.
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    read(headers, SESSION_COOKIE).filter(|token| !token.is_empty())
}

/// `Set-Cookie` that writes the mirror for an administrator. `secure` adds the
/// `Secure` attribute (production, served over HTTPS).
pub fn set_role_mirror(max_age: i64, secure: bool) -> HeaderValue {
    build(ROLE_COOKIE, ROLE_MIRROR_TRUE, max_age, false, secure)
}

/// `Set-Cookie` that removes the mirror.
pub fn clear_role_mirror(secure: bool) -> HeaderValue {
    build(ROLE_COOKIE, "", 0, false, secure)
}

/// `Set-Cookie` that stores the access token. Returns `None` if the token cannot be a
/// header value.
pub fn set_session(token: &str, max_age: i64, secure: bool) -> Option<HeaderValue> {
    let mut value = format!(
        "{SESSION_COOKIE}={token}; Path=/; Max-Age={max_age}; SameSite=Lax; HttpOnly"
    );
    if secure {
        value.push_str("; Secure");
    }
    HeaderValue::from_str(&value).ok()
}

/// `Set-Cookie` that removes the access token.
pub fn clear_session(secure: bool) -> HeaderValue {
    build(SESSION_COOKIE, "", 0, true, secure)
}

fn build(
    name: &'static str,
    value: &'static str,
    max_age: i64,
    http_only: bool,
    secure: bool,
) -> HeaderValue {
    let mut cookie = format!("{name}={value}; Path=/; Max-Age={}; SameSite=Lax", max_age.max(0));
    if http_only {
        cookie.push_str("; HttpOnly");
    }
    if secure {
        cookie.push_str("; Secure");
    }
    // Built only from static names/values and an integer.
    HeaderValue::from_str(&cookie).unwrap_or_else(|_| HeaderValue::from_static(""))
}
