use std::env;
use std::time::Duration;

use crate::access::RouteTable;

/// AppConfig
///
/// Holds the application's entire configuration state. Loaded once at startup and
/// shared read-only with every request through `FromRef`.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Runtime environment marker. Selects log format and secret strictness.
    pub env: Env,
    // Address the HTTP listener binds to.
    pub bind_addr: String,
    // Base URL of the Supabase project (e.g. https://xyz.supabase.co).
    pub supabase_url: String,
    // Public anon key sent as the `apikey` header on every Auth API call.
    pub supabase_anon_key: String,
    // Secret used to validate access tokens carried in the session cookie.
    pub jwt_secret: String,
    // Where the password reset email sends the user back to.
    pub password_reset_redirect: String,
    // Google Calendar API base URL, the club calendar id and the API key.
    pub calendar_api_url: String,
    pub calendar_id: String,
    pub calendar_api_key: String,
    // Render Guard tuning.
    pub guard: GuardPolicy,
    // Static prefix-to-class table. The interceptor and the guarded pages both classify
    // paths through it.
    pub route_table: RouteTable,
}

/// Env
///
/// Defines the runtime context: local development or production.
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

/// GuardPolicy
///
/// Bounds on the Render Guard's calls to the identity service. The whole resolution
/// must finish inside `timeout`; each individual call may be retried `max_retries`
/// times on transient failures, waiting `initial_backoff * 2^attempt` (capped at
/// `max_backoff`) in between.
#[derive(Clone, Debug, PartialEq)]
pub struct GuardPolicy {
    pub timeout: Duration,
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for GuardPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(5_000),
            max_retries: 2,
            initial_backoff: Duration::from_millis(200),
            max_backoff: Duration::from_secs(2),
        }
    }
}

const LOCAL_JWT_SECRET: &str = "super-secure-test-secret-value-local";
const GOOGLE_CALENDAR_API: &str = "https://www.googleapis.com/calendar/v3";

impl Default for AppConfig {
    /// Safe, non-panicking configuration used by tests and local scaffolding.
    fn default() -> Self {
        Self {
            env: Env::Local,
            bind_addr: "0.0.0.0:3000".to_string(),
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "local-anon-key".to_string(),
            jwt_secret: LOCAL_JWT_SECRET.to_string(),
            password_reset_redirect: "http://localhost:3000/reset-password".to_string(),
            calendar_api_url: GOOGLE_CALENDAR_API.to_string(),
            calendar_id: "club@group.calendar.google.com".to_string(),
            calendar_api_key: "local-calendar-key".to_string(),
            guard: GuardPolicy::default(),
            route_table: RouteTable::default(),
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads the configuration from environment variables (call `dotenv` first).
    ///
    /// # Panics
    /// Panics in production when any Supabase secret is missing, so the server never
    /// starts with an identity boundary it cannot verify against.
    pub fn load() -> Self {
        let env = match env::var("APP_ENV").as_deref() {
            Ok("production") => Env::Production,
            _ => Env::Local,
        };
        let defaults = Self::default();

        let (supabase_url, supabase_anon_key, jwt_secret) = match env {
            Env::Production => (
                env::var("SUPABASE_URL").expect("FATAL: SUPABASE_URL required in prod"),
                env::var("SUPABASE_ANON_KEY").expect("FATAL: SUPABASE_ANON_KEY required in prod"),
                env::var("SUPABASE_JWT_SECRET")
                    .expect("FATAL: SUPABASE_JWT_SECRET must be set in production."),
            ),
            Env::Local => (
                env::var("SUPABASE_URL").unwrap_or(defaults.supabase_url),
                env::var("SUPABASE_ANON_KEY").unwrap_or(defaults.supabase_anon_key),
                env::var("SUPABASE_JWT_SECRET").unwrap_or(defaults.jwt_secret),
            ),
        };

        let guard = GuardPolicy {
            timeout: millis_var("GUARD_TIMEOUT_MS").unwrap_or(defaults.guard.timeout),
            max_retries: env::var("GUARD_MAX_RETRIES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.guard.max_retries),
            initial_backoff: millis_var("GUARD_RETRY_BACKOFF_MS")
                .unwrap_or(defaults.guard.initial_backoff),
            max_backoff: defaults.guard.max_backoff,
        };

        Self {
            env,
            bind_addr: env::var("BIND_ADDR").unwrap_or(defaults.bind_addr),
            supabase_url: supabase_url.trim_end_matches('/').to_string(),
            supabase_anon_key,
            jwt_secret,
            password_reset_redirect: env::var("PASSWORD_RESET_REDIRECT")
                .unwrap_or(defaults.password_reset_redirect),
            calendar_api_url: env::var("CALENDAR_API_URL").unwrap_or(defaults.calendar_api_url),
            calendar_id: env::var("CALENDAR_ID").unwrap_or(defaults.calendar_id),
            calendar_api_key: env::var("CALENDAR_API_KEY").unwrap_or(defaults.calendar_api_key),
            guard,
            route_table: defaults.route_table,
        }
    }

    /// Cookies get the `Secure` attribute in production, where the site is served
    /// over HTTPS only.
    pub fn secure_cookies(&self) -> bool {
        self.env == Env::Production
    }
}

fn millis_var(name: &str) -> Option<Duration> {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_millis)
}
