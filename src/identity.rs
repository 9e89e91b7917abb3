use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use parking_lot::Mutex;
use reqwest::StatusCode;
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    config::AppConfig,
    error::IdentityError,
    models::{Principal, RoleClaims, Session, SignInGrant},
};

// 1. IdentityService Contract
/// IdentityService
///
/// The boundary to the hosted identity service. Sessions, principals and their role
/// claims are owned there; this crate only asks. Injected as [`IdentityState`] so tests
/// can substitute [`MockIdentityService`] without network access.
#[async_trait]
pub trait IdentityService: Send + Sync {
    /// Resolves the active session for an access token. `Ok(None)` when there is no
    /// token, or the token is invalid or expired.
    async fn get_session(&self, access_token: Option<&str>)
    -> Result<Option<Session>, IdentityError>;

    /// Fetches the principal (with its claims) behind a session. `Ok(None)` when the
    /// service no longer knows the user.
    async fn get_user(&self, session: &Session) -> Result<Option<Principal>, IdentityError>;

    /// Password sign-in.
    async fn sign_in(&self, email: &str, password: &str) -> Result<SignInGrant, IdentityError>;

    /// Creates an account. Confirmation emails are sent by the service.
    async fn sign_up(&self, email: &str, password: &str) -> Result<Principal, IdentityError>;

    /// Asks the service to email a password reset link pointing at `redirect_to`.
    async fn send_password_reset(&self, email: &str, redirect_to: &str)
    -> Result<(), IdentityError>;

    /// Sets a new password for the session's user.
    async fn update_password(&self, session: &Session, password: &str)
    -> Result<(), IdentityError>;

    /// Revokes the session on the service side.
    async fn sign_out(&self, session: &Session) -> Result<(), IdentityError>;
}

/// IdentityState
///
/// The concrete type used to share the identity boundary across the application state.
pub type IdentityState = Arc<dyn IdentityService>;

// 2. The Real Implementation (Supabase Auth)

/// Audience Supabase puts in tokens issued to signed-in users.
const AUTHENTICATED_AUDIENCE: &str = "authenticated";

/// Claims read from a Supabase access token.
#[derive(Debug, Deserialize)]
struct AccessClaims {
    sub: Uuid,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct SupabaseUser {
    id: Uuid,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    app_metadata: RoleClaims,
}

impl From<SupabaseUser> for Principal {
    fn from(user: SupabaseUser) -> Self {
        Principal {
            id: user.id,
            email: user.email.unwrap_or_default(),
            claims: user.app_metadata,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
    user: SupabaseUser,
}

/// Signup answers with the bare user when email confirmation is on, and with a full
/// session when accounts are auto-confirmed.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SignUpPayload {
    WithSession { user: SupabaseUser },
    Bare(SupabaseUser),
}

/// SupabaseIdentity
///
/// Talks to the Supabase Auth REST API. Access tokens are validated locally against
/// the project's JWT secret; the role claim is read from the user's `app_metadata`,
/// which only the service (never the user) can write.
#[derive(Clone)]
pub struct SupabaseIdentity {
    client: reqwest::Client,
    base_url: String,
    anon_key: String,
    jwt_secret: String,
}

impl SupabaseIdentity {
    pub fn new(config: &AppConfig) -> Self {
        Self::with_client(reqwest::Client::new(), config)
    }

    pub fn with_client(client: reqwest::Client, config: &AppConfig) -> Self {
        Self {
            client,
            base_url: config.supabase_url.trim_end_matches('/').to_string(),
            anon_key: config.supabase_anon_key.clone(),
            jwt_secret: config.jwt_secret.clone(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, path)
    }
}

/// Maps a non-success status onto the error taxonomy. The body is never echoed.
fn check_status(status: StatusCode) -> Result<(), IdentityError> {
    if status.is_success() {
        Ok(())
    } else if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        Err(IdentityError::Unauthorized)
    } else if status.is_client_error() {
        Err(IdentityError::Rejected(status.to_string()))
    } else {
        Err(IdentityError::Transport(format!("status {status}")))
    }
}

#[async_trait]
impl IdentityService for SupabaseIdentity {
    async fn get_session(
        &self,
        access_token: Option<&str>,
    ) -> Result<Option<Session>, IdentityError> {
        let Some(token) = access_token else {
            return Ok(None);
        };

        let key = DecodingKey::from_secret(self.jwt_secret.as_bytes());
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[AUTHENTICATED_AUDIENCE]);
        validation.validate_exp = true;

        match decode::<AccessClaims>(token, &key, &validation) {
            Ok(data) => Ok(Some(Session {
                access_token: token.to_string(),
                user_id: data.claims.sub,
                expires_at: data.claims.exp,
            })),
            Err(e) => {
                tracing::debug!(reason = ?e.kind(), "access token rejected");
                Ok(None)
            }
        }
    }

    async fn get_user(&self, session: &Session) -> Result<Option<Principal>, IdentityError> {
        let response = self
            .client
            .get(self.url("user"))
            .header("apikey", &self.anon_key)
            .bearer_auth(&session.access_token)
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        check_status(response.status())?;

        let user = response.json::<SupabaseUser>().await?;
        Ok(Some(user.into()))
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<SignInGrant, IdentityError> {
        let response = self
            .client
            .post(self.url("token"))
            .query(&[("grant_type", "password")])
            .header("apikey", &self.anon_key)
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await?;

        // Wrong credentials come back as 400 invalid_grant.
        match check_status(response.status()) {
            Err(IdentityError::Rejected(_)) => return Err(IdentityError::Unauthorized),
            other => other?,
        }

        let token = response.json::<TokenResponse>().await?;
        let principal: Principal = token.user.into();
        Ok(SignInGrant {
            session: Session {
                access_token: token.access_token,
                user_id: principal.id,
                expires_at: chrono::Utc::now().timestamp() + token.expires_in,
            },
            expires_in: token.expires_in,
            principal,
        })
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<Principal, IdentityError> {
        let response = self
            .client
            .post(self.url("signup"))
            .header("apikey", &self.anon_key)
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await?;
        check_status(response.status())?;

        let user = match response.json::<SignUpPayload>().await? {
            SignUpPayload::WithSession { user } => user,
            SignUpPayload::Bare(user) => user,
        };
        Ok(user.into())
    }

    async fn send_password_reset(
        &self,
        email: &str,
        redirect_to: &str,
    ) -> Result<(), IdentityError> {
        let response = self
            .client
            .post(self.url("recover"))
            .query(&[("redirect_to", redirect_to)])
            .header("apikey", &self.anon_key)
            .json(&serde_json::json!({ "email": email }))
            .send()
            .await?;
        check_status(response.status())
    }

    async fn update_password(
        &self,
        session: &Session,
        password: &str,
    ) -> Result<(), IdentityError> {
        let response = self
            .client
            .put(self.url("user"))
            .header("apikey", &self.anon_key)
            .bearer_auth(&session.access_token)
            .json(&serde_json::json!({ "password": password }))
            .send()
            .await?;
        check_status(response.status())
    }

    async fn sign_out(&self, session: &Session) -> Result<(), IdentityError> {
        let response = self
            .client
            .post(self.url("logout"))
            .header("apikey", &self.anon_key)
            .bearer_auth(&session.access_token)
            .send()
            .await?;
        check_status(response.status())
    }
}

// 3. The Mock Implementation (For Tests)

/// MockIdentityService
///
/// In-memory identity service. Tokens map to principals; accounts map an email and
/// password to a token. Latency, hangs and transient failures can be injected, and
/// every session/user lookup is counted so tests can assert what was (not) called.
#[derive(Default)]
pub struct MockIdentityService {
    sessions: HashMap<String, Principal>,
    accounts: HashMap<String, (String, String)>,
    latency: Duration,
    hang: bool,
    always_fail: bool,
    transient_failures: AtomicU32,
    session_calls: AtomicUsize,
    user_calls: AtomicUsize,
    completed_calls: AtomicUsize,
    reset_emails: Mutex<Vec<String>>,
    signed_out: Mutex<Vec<String>>,
    password_updates: Mutex<Vec<(Uuid, String)>>,
}

/// Lifetime the mock reports for issued tokens.
const MOCK_EXPIRES_IN: i64 = 3600;

impl MockIdentityService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a valid access token for `principal`.
    pub fn with_session(mut self, token: &str, principal: Principal) -> Self {
        self.sessions.insert(token.to_string(), principal);
        self
    }

    /// Registers an account that signs in with `email`/`password` and receives `token`.
    pub fn with_account(mut self, email: &str, password: &str, token: &str, principal: Principal) -> Self {
        self.accounts
            .insert(email.to_string(), (password.to_string(), token.to_string()));
        self.with_session(token, principal)
    }

    /// Delays every session/user lookup.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Session/user lookups never answer.
    pub fn hanging(mut self) -> Self {
        self.hang = true;
        self
    }

    /// Every call fails with a transport error.
    pub fn failing(mut self) -> Self {
        self.always_fail = true;
        self
    }

    /// The next `count` session/user lookups fail with a transport error.
    pub fn failing_transiently(self, count: u32) -> Self {
        self.transient_failures.store(count, Ordering::SeqCst);
        self
    }

    pub fn session_calls(&self) -> usize {
        self.session_calls.load(Ordering::SeqCst)
    }

    pub fn user_calls(&self) -> usize {
        self.user_calls.load(Ordering::SeqCst)
    }

    /// Lookups that ran to completion (not cancelled mid-flight).
    pub fn completed_calls(&self) -> usize {
        self.completed_calls.load(Ordering::SeqCst)
    }

    pub fn reset_emails(&self) -> Vec<String> {
        self.reset_emails.lock().clone()
    }

    pub fn signed_out_tokens(&self) -> Vec<String> {
        self.signed_out.lock().clone()
    }

    pub fn password_updates(&self) -> Vec<(Uuid, String)> {
        self.password_updates.lock().clone()
    }

    async fn simulate(&self) -> Result<(), IdentityError> {
        if self.hang {
            std::future::pending::<()>().await;
        }
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        if self.always_fail {
            return Err(IdentityError::Transport("mock transport failure".to_string()));
        }
        let failed = self
            .transient_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            return Err(IdentityError::Transport("mock transient failure".to_string()));
        }
        Ok(())
    }

    fn check_available(&self) -> Result<(), IdentityError> {
        if self.always_fail {
            return Err(IdentityError::Transport("mock transport failure".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl IdentityService for MockIdentityService {
    async fn get_session(
        &self,
        access_token: Option<&str>,
    ) -> Result<Option<Session>, IdentityError> {
        self.session_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate().await?;
        self.completed_calls.fetch_add(1, Ordering::SeqCst);

        Ok(access_token.and_then(|token| {
            self.sessions.get(token).map(|principal| Session {
                access_token: token.to_string(),
                user_id: principal.id,
                expires_at: chrono::Utc::now().timestamp() + MOCK_EXPIRES_IN,
            })
        }))
    }

    async fn get_user(&self, session: &Session) -> Result<Option<Principal>, IdentityError> {
        self.user_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate().await?;
        self.completed_calls.fetch_add(1, Ordering::SeqCst);

        Ok(self.sessions.get(&session.access_token).cloned())
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<SignInGrant, IdentityError> {
        self.check_available()?;
        let (expected, token) = self.accounts.get(email).ok_or(IdentityError::Unauthorized)?;
        if expected != password {
            return Err(IdentityError::Unauthorized);
        }
        let principal = self
            .sessions
            .get(token)
            .cloned()
            .ok_or(IdentityError::Unauthorized)?;
        Ok(SignInGrant {
            session: Session {
                access_token: token.clone(),
                user_id: principal.id,
                expires_at: chrono::Utc::now().timestamp() + MOCK_EXPIRES_IN,
            },
            expires_in: MOCK_EXPIRES_IN,
            principal,
        })
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<Principal, IdentityError> {
        self.check_available()?;
        if self.accounts.contains_key(email) {
            return Err(IdentityError::Rejected("email already registered".to_string()));
        }
        if password.len() < 6 {
            return Err(IdentityError::Rejected("weak password".to_string()));
        }
        Ok(Principal {
            id: Uuid::new_v4(),
            email: email.to_string(),
            claims: RoleClaims::default(),
        })
    }

    async fn send_password_reset(
        &self,
        email: &str,
        _redirect_to: &str,
    ) -> Result<(), IdentityError> {
        self.check_available()?;
        self.reset_emails.lock().push(email.to_string());
        Ok(())
    }

    async fn update_password(
        &self,
        session: &Session,
        password: &str,
    ) -> Result<(), IdentityError> {
        self.check_available()?;
        self.password_updates
            .lock()
            .push((session.user_id, password.to_string()));
        Ok(())
    }

    async fn sign_out(&self, session: &Session) -> Result<(), IdentityError> {
        self.check_available()?;
        self.signed_out.lock().push(session.access_token.clone());
        Ok(())
    }
}
