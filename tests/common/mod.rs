#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Request, Response, header},
};
use club_portal::{
    AppConfig, AppState, MockCalendarService, MockIdentityService, create_router,
    calendar::CalendarState,
    config::GuardPolicy,
    identity::IdentityState,
    models::{CalendarEvent, Principal, RoleClaims},
};
use std::{sync::Arc, time::Duration};
use uuid::Uuid;

pub const ADMIN_TOKEN: &str = "admin-access-token";
pub const MEMBER_TOKEN: &str = "member-access-token";

pub fn admin() -> Principal {
    Principal {
        id: Uuid::from_u128(1),
        email: "president@club.test".to_string(),
        claims: RoleClaims {
            administrator: true,
        },
    }
}

pub fn member() -> Principal {
    Principal {
        id: Uuid::from_u128(2),
        email: "handler@club.test".to_string(),
        claims: RoleClaims {
            administrator: false,
        },
    }
}

/// Identity fake knowing one admin and one member session.
pub fn identity() -> MockIdentityService {
    MockIdentityService::new()
        .with_account("president@club.test", "border-collie", ADMIN_TOKEN, admin())
        .with_account("handler@club.test", "malinois", MEMBER_TOKEN, member())
}

/// Short timeouts and no backoff so failure paths finish quickly.
pub fn fast_policy() -> GuardPolicy {
    GuardPolicy {
        timeout: Duration::from_millis(300),
        max_retries: 2,
        initial_backoff: Duration::from_millis(1),
        max_backoff: Duration::from_millis(5),
    }
}

pub fn events() -> Vec<CalendarEvent> {
    vec![
        CalendarEvent {
            id: "evt-1".to_string(),
            summary: "Agility training".to_string(),
            start: "2026-11-07T09:00:00+01:00".to_string(),
            end: "2026-11-07T12:00:00+01:00".to_string(),
            location: Some("Club field".to_string()),
            all_day: false,
        },
        CalendarEvent {
            id: "evt-2".to_string(),
            summary: "Regional competition".to_string(),
            start: "2026-11-15".to_string(),
            end: "2026-11-16".to_string(),
            location: None,
            all_day: true,
        },
    ]
}

/// Local defaults with the fast guard policy.
pub fn config() -> AppConfig {
    AppConfig {
        guard: fast_policy(),
        ..AppConfig::default()
    }
}

pub fn app_with(identity: Arc<MockIdentityService>, calendar: MockCalendarService) -> Router {
    app_with_config(config(), identity, calendar)
}

pub fn app_with_config(
    config: AppConfig,
    identity: Arc<MockIdentityService>,
    calendar: MockCalendarService,
) -> Router {
    let state = AppState::new(
        config,
        identity as IdentityState,
        Arc::new(calendar) as CalendarState,
    );
    create_router(state)
}

pub fn app(identity: Arc<MockIdentityService>) -> Router {
    app_with(identity, MockCalendarService::new(events()))
}

pub fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

pub fn post_json(uri: &str, cookie: Option<&str>, body: serde_json::Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn location(response: &Response<Body>) -> Option<&str> {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|value| value.to_str().ok())
}

pub fn set_cookies(response: &Response<Body>) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|value| value.to_str().unwrap().to_string())
        .collect()
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}
