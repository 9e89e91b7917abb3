mod common;

use club_portal::{
    MockIdentityService,
    access::{Destination, RouteClass},
    error::GateError,
    guard::{GuardState, LOADING_PLACEHOLDER, PageSlot, PageView, RenderGuard},
    identity::IdentityState,
};
use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

fn guard_for(identity: Arc<MockIdentityService>) -> RenderGuard {
    RenderGuard::new(identity as IdentityState, common::fast_policy())
}

fn token(value: &str) -> Option<String> {
    Some(value.to_string())
}

#[tokio::test]
async fn test_no_session_redirects_to_sign_in_and_never_authorizes() {
    let identity = Arc::new(common::identity());
    let guard = guard_for(identity.clone());

    for required in [RouteClass::MemberOnly, RouteClass::AdminOnly] {
        for access_token in [None, token("unknown-token")] {
            let mut mount = guard.mount(required, access_token);
            let state = mount.settled().await;
            assert_eq!(state, GuardState::Redirecting(Destination::SignIn));
        }
    }
    // Without a session the principal is never fetched.
    assert_eq!(identity.user_calls(), 0);
}

#[tokio::test]
async fn test_member_on_admin_page_goes_to_the_canonical_unauthorized_page() {
    let identity = Arc::new(common::identity());
    let guard = guard_for(identity);

    let mut mount = guard.mount(RouteClass::AdminOnly, token(common::MEMBER_TOKEN));
    assert_eq!(
        mount.settled().await,
        GuardState::Redirecting(Destination::Unauthorized)
    );

    let result = guard
        .check(RouteClass::AdminOnly, Some(common::MEMBER_TOKEN))
        .await;
    assert!(matches!(
        result,
        Err(GateError::RoleMismatch(Destination::Unauthorized))
    ));
}

#[tokio::test]
async fn test_member_on_member_page_is_authorized() {
    let identity = Arc::new(common::identity());
    let guard = guard_for(identity);

    let mut mount = guard.mount(RouteClass::MemberOnly, token(common::MEMBER_TOKEN));
    assert_eq!(mount.settled().await, GuardState::Authorized(common::member()));
}

#[tokio::test]
async fn test_admin_is_authorized_and_content_renders_exactly_once() {
    let identity = Arc::new(common::identity());
    let guard = guard_for(identity);
    let renders = AtomicUsize::new(0);

    let mut mount = guard.mount(RouteClass::AdminOnly, token(common::ADMIN_TOKEN));
    assert_eq!(mount.settled().await, GuardState::Authorized(common::admin()));

    let view = mount.view(|principal| {
        renders.fetch_add(1, Ordering::SeqCst);
        format!("dashboard for {}", principal.email)
    });

    assert_eq!(
        view,
        PageView::Content("dashboard for president@club.test".to_string())
    );
    assert_eq!(renders.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_resolving_shows_placeholder_never_content() {
    let identity = Arc::new(
        common::identity().with_latency(Duration::from_millis(50)),
    );
    let guard = guard_for(identity);
    let renders = AtomicUsize::new(0);

    let mut mount = guard.mount(RouteClass::AdminOnly, token(common::ADMIN_TOKEN));
    assert_eq!(mount.state(), GuardState::Resolving);

    let view = mount.view(|_| {
        renders.fetch_add(1, Ordering::SeqCst);
        "secret".to_string()
    });
    assert_eq!(view, PageView::Loading);
    assert_eq!(renders.load(Ordering::SeqCst), 0);

    mount.settled().await;
    assert!(matches!(mount.view(|_| "secret".to_string()), PageView::Content(_)));
}

#[tokio::test]
async fn test_redirecting_renders_nothing() {
    let identity = Arc::new(common::identity());
    let guard = guard_for(identity);
    let renders = AtomicUsize::new(0);

    let mut mount = guard.mount(RouteClass::MemberOnly, None);
    mount.settled().await;

    let view = mount.view(|_| {
        renders.fetch_add(1, Ordering::SeqCst);
        "secret".to_string()
    });
    assert_eq!(view, PageView::Redirect(Destination::SignIn));
    assert_ne!(view, PageView::Loading);
    assert_eq!(renders.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_hung_identity_service_times_out_to_sign_in() {
    let identity = Arc::new(common::identity().hanging());
    let guard = guard_for(identity);

    let started = std::time::Instant::now();
    let mut mount = guard.mount(RouteClass::AdminOnly, token(common::ADMIN_TOKEN));
    let state = tokio::time::timeout(Duration::from_secs(5), mount.settled())
        .await
        .expect("guard must give up on its own");

    assert_eq!(state, GuardState::Redirecting(Destination::SignIn));
    assert!(started.elapsed() >= common::fast_policy().timeout);
}

#[tokio::test]
async fn test_transient_failures_are_retried() {
    // Two transport failures, two retries allowed.
    let identity = Arc::new(common::identity().failing_transiently(2));
    let guard = guard_for(identity.clone());

    let mut mount = guard.mount(RouteClass::AdminOnly, token(common::ADMIN_TOKEN));
    assert_eq!(mount.settled().await, GuardState::Authorized(common::admin()));
    assert_eq!(identity.session_calls(), 3);
    assert_eq!(identity.user_calls(), 1);
}

#[tokio::test]
async fn test_retries_are_bounded() {
    let identity = Arc::new(common::identity().failing());
    let guard = guard_for(identity.clone());

    let mut mount = guard.mount(RouteClass::MemberOnly, token(common::MEMBER_TOKEN));
    assert_eq!(
        mount.settled().await,
        GuardState::Redirecting(Destination::SignIn)
    );
    // One attempt plus max_retries.
    assert_eq!(
        identity.session_calls(),
        1 + common::fast_policy().max_retries as usize
    );
}

#[tokio::test]
async fn test_unmount_cancels_in_flight_resolution() {
    let identity = Arc::new(
        common::identity().with_latency(Duration::from_millis(100)),
    );
    let guard = guard_for(identity.clone());

    let mount = guard.mount(RouteClass::AdminOnly, None);
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(identity.session_calls(), 1);

    mount.unmount();
    tokio::time::sleep(Duration::from_millis(200)).await;

    // The lookup was dropped mid-flight; nothing completed, nothing followed.
    assert_eq!(identity.completed_calls(), 0);
    assert_eq!(identity.user_calls(), 0);
}

#[tokio::test]
async fn test_remounting_never_races_two_resolutions() {
    let identity = Arc::new(
        common::identity().with_latency(Duration::from_millis(60)),
    );
    let guard = guard_for(identity.clone());
    let mut slot = PageSlot::new(guard);

    // Mount/unmount/remount in quick succession. Only the last mount may settle,
    // and it settles to its own outcome.
    slot.mount(RouteClass::AdminOnly, None);
    tokio::time::sleep(Duration::from_millis(10)).await;
    slot.unmount();
    slot.mount(RouteClass::AdminOnly, token(common::MEMBER_TOKEN));
    tokio::time::sleep(Duration::from_millis(10)).await;
    let last = slot.mount(RouteClass::AdminOnly, token(common::ADMIN_TOKEN));

    assert_eq!(last.settled().await, GuardState::Authorized(common::admin()));
    tokio::time::sleep(Duration::from_millis(150)).await;

    // The current mount still shows its own result; the cancelled ones never
    // finished a lookup (two for the admin mount: session then user).
    let current = slot.current().unwrap();
    assert_eq!(current.state(), GuardState::Authorized(common::admin()));
    assert_eq!(identity.completed_calls(), 2);
    assert_eq!(identity.user_calls(), 1);
}

#[tokio::test]
async fn test_page_view_responses() {
    use axum::{http::StatusCode, response::IntoResponse};

    let loading = PageView::Loading.into_response();
    assert_eq!(loading.status(), StatusCode::OK);
    let body = common::body_text(loading).await;
    assert_eq!(body, LOADING_PLACEHOLDER);

    let redirect = PageView::Redirect(Destination::Unauthorized).into_response();
    assert_eq!(redirect.status(), StatusCode::SEE_OTHER);
    assert_eq!(common::location(&redirect), Some("/unauthorized"));
    assert!(common::body_text(redirect).await.is_empty());
}
