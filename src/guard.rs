//! Render Guard.
//!
//! Runs once per page mount for a protected page. It resolves the caller's principal
//! against the identity service (session first, then the user and its claims), feeds
//! the role to [`access::decide`], and ends in `Authorized` or `Redirecting`.
//!
//! ```text
//! Resolving ──► Authorized(principal)
//!     └───────► Redirecting(destination)
//! ```
//!
//! While `Resolving` the page shows a neutral placeholder, never the protected
//! content. Identity calls are retried on transient failures and the whole resolution
//! is bounded by [`GuardPolicy::timeout`]; running out of time counts as unauthorized.
//! Dropping a [`GuardMount`] aborts its resolution, so a page that was left can never
//! receive a redirect.

use axum::response::{Html, IntoResponse, Redirect, Response};
use tokio::{sync::watch, task::JoinHandle};

use crate::{
    access::{self, Decision, Destination, Role, RouteClass},
    config::GuardPolicy,
    error::{GateError, IdentityError},
    identity::{IdentityService, IdentityState},
    models::Principal,
    retry::with_retry,
};

/// Markup shown while the guard is resolving.
pub const LOADING_PLACEHOLDER: &str = r#"<p class="loading" role="status">Loading…</p>"#;

/// GuardState
#[derive(Debug, Clone, PartialEq)]
pub enum GuardState {
    Resolving,
    Authorized(Principal),
    Redirecting(Destination),
}

impl GuardState {
    fn is_settled(&self) -> bool {
        !matches!(self, GuardState::Resolving)
    }
}

impl From<Result<Principal, GateError>> for GuardState {
    fn from(result: Result<Principal, GateError>) -> Self {
        match result {
            Ok(principal) => GuardState::Authorized(principal),
            Err(err) => GuardState::Redirecting(err.destination()),
        }
    }
}

/// PageView
///
/// What a guarded page puts on screen for a given guard state.
#[derive(Debug, Clone, PartialEq)]
pub enum PageView {
    Loading,
    Content(String),
    /// Nothing is rendered; the browser is sent to the destination instead.
    Redirect(Destination),
}

impl IntoResponse for PageView {
    fn into_response(self) -> Response {
        match self {
            PageView::Loading => Html(LOADING_PLACEHOLDER).into_response(),
            PageView::Content(html) => Html(html).into_response(),
            // A redirect response does not leave the protected URL in history.
            PageView::Redirect(destination) => Redirect::to(destination.path()).into_response(),
        }
    }
}

/// RenderGuard
///
/// Holds the injected identity boundary and the retry/timeout policy. Cheap to clone.
#[derive(Clone)]
pub struct RenderGuard {
    identity: IdentityState,
    policy: GuardPolicy,
}

impl RenderGuard {
    pub fn new(identity: IdentityState, policy: GuardPolicy) -> Self {
        Self { identity, policy }
    }

    /// Starts a resolution for one page mount.
    pub fn mount(&self, required: RouteClass, access_token: Option<String>) -> GuardMount {
        let (tx, rx) = watch::channel(GuardState::Resolving);
        let guard = self.clone();

        let task = tokio::spawn(async move {
            let state = GuardState::from(guard.check(required, access_token.as_deref()).await);
            // Fails only when the mount is gone, in which case the result is discarded.
            let _ = tx.send(state);
        });

        GuardMount { state: rx, task }
    }

    /// Resolves the principal and applies the shared predicate for `required`.
    pub async fn check(
        &self,
        required: RouteClass,
        access_token: Option<&str>,
    ) -> Result<Principal, GateError> {
        let result = self.resolve_principal(access_token).await.and_then(|principal| {
            let role = Role::from_principal(Some(&principal));
            match access::decide(required, role) {
                Decision::Allow => Ok(principal),
                Decision::Redirect(destination) => Err(GateError::RoleMismatch(destination)),
            }
        });

        match &result {
            Ok(principal) => {
                tracing::debug!(required = ?required, user_id = %principal.id, "render guard authorized")
            }
            Err(err) => tracing::info!(
                required = ?required,
                destination = err.destination().path(),
                reason = %err,
                "render guard redirect",
            ),
        }
        result
    }

    /// Steps 1 and 2: session, then principal. Bounded by the policy timeout.
    pub async fn resolve_principal(
        &self,
        access_token: Option<&str>,
    ) -> Result<Principal, GateError> {
        match tokio::time::timeout(self.policy.timeout, self.lookup(access_token)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(
                    timeout_ms = self.policy.timeout.as_millis() as u64,
                    "identity service did not answer before the guard timeout",
                );
                Err(GateError::PrincipalFetchFailed(IdentityError::Timeout))
            }
        }
    }

    async fn lookup(&self, access_token: Option<&str>) -> Result<Principal, GateError> {
        let identity: &dyn IdentityService = self.identity.as_ref();

        let session = match with_retry(&self.policy, "get_session", || {
            identity.get_session(access_token)
        })
        .await
        {
            Ok(Some(session)) => session,
            Ok(None) => return Err(GateError::NoSession),
            Err(err) => {
                tracing::debug!(error = %err, "session lookup failed");
                return Err(GateError::NoSession);
            }
        };

        with_retry(&self.policy, "get_user", || identity.get_user(&session))
            .await
            .map_err(GateError::PrincipalFetchFailed)?
            .ok_or(GateError::NoSession)
    }
}

/// GuardMount
///
/// One page mount's view of its guard. Dropping it cancels the resolution.
pub struct GuardMount {
    state: watch::Receiver<GuardState>,
    task: JoinHandle<()>,
}

impl GuardMount {
    pub fn state(&self) -> GuardState {
        self.state.borrow().clone()
    }

    /// Waits for the resolution to finish.
    pub async fn settled(&mut self) -> GuardState {
        match self.state.wait_for(GuardState::is_settled).await {
            Ok(state) => state.clone(),
            // The task died without publishing; fail closed.
            Err(_) => GuardState::Redirecting(Destination::SignIn),
        }
    }

    /// Renders the current state. `content` runs only when authorized, and at most once
    /// per call.
    pub fn view<F>(&self, content: F) -> PageView
    where
        F: FnOnce(&Principal) -> String,
    {
        match &*self.state.borrow() {
            GuardState::Resolving => PageView::Loading,
            GuardState::Authorized(principal) => PageView::Content(content(principal)),
            GuardState::Redirecting(destination) => PageView::Redirect(*destination),
        }
    }

    pub fn unmount(self) {}
}

impl Drop for GuardMount {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// PageSlot
///
/// A page instance that holds at most one live mount. Mounting again cancels the
/// previous resolution first, so two resolutions can never race to redirect.
pub struct PageSlot {
    guard: RenderGuard,
    current: Option<GuardMount>,
}

impl PageSlot {
    pub fn new(guard: RenderGuard) -> Self {
        Self {
            guard,
            current: None,
        }
    }

    pub fn mount(&mut self, required: RouteClass, access_token: Option<String>) -> &mut GuardMount {
        self.unmount();
        self.current
            .insert(self.guard.mount(required, access_token))
    }

    pub fn unmount(&mut self) {
        if let Some(mount) = self.current.take() {
            mount.unmount();
        }
    }

    pub fn current(&mut self) -> Option<&mut GuardMount> {
        self.current.as_mut()
    }
}
