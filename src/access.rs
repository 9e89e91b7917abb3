//! Shared role resolution and the single authorization predicate.
//!
//! Both the request-time interceptor (cookie only) and the render-time guard
//! (identity service) resolve a [`Role`] here and hand it to [`decide`], so the
//! predicate and the redirect targets exist in exactly one place.

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;

use crate::models::Principal;

/// The only cookie value the role mirror accepts as "administrator".
pub const ROLE_MIRROR_TRUE: &str = "true";

/// Role
///
/// What a caller is allowed to be treated as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Role {
    Anonymous,
    Member,
    Administrator,
}

impl Role {
    /// Fast path: resolves from the role mirror cookie alone.
    ///
    /// The mirror only records the admin flag, so anything other than the exact
    /// string `"true"` (absent, empty, differently cased, padded) is `Anonymous`.
    pub fn from_cookie(mirror: Option<&str>) -> Self {
        match mirror {
            Some(ROLE_MIRROR_TRUE) => Role::Administrator,
            _ => Role::Anonymous,
        }
    }

    /// Authoritative path: resolves from the principal returned by the identity service.
    pub fn from_principal(principal: Option<&Principal>) -> Self {
        match principal {
            None => Role::Anonymous,
            Some(p) if p.claims.administrator => Role::Administrator,
            Some(_) => Role::Member,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Anonymous => "anonymous",
            Role::Member => "member",
            Role::Administrator => "administrator",
        }
    }
}

/// RouteClass
///
/// Static classification of a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    Public,
    MemberOnly,
    AdminOnly,
}

/// Destination
///
/// The canonical redirect targets. "Authenticated but wrong role" always goes to
/// [`Destination::Unauthorized`], whichever check noticed it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub enum Destination {
    #[serde(rename = "/login")]
    SignIn,
    #[serde(rename = "/unauthorized")]
    Unauthorized,
    #[serde(rename = "/dashboard/client")]
    MemberDashboard,
    #[serde(rename = "/admin/dashboard")]
    AdminDashboard,
}

impl Destination {
    pub fn path(&self) -> &'static str {
        match self {
            Destination::SignIn => "/login",
            Destination::Unauthorized => "/unauthorized",
            Destination::MemberDashboard => "/dashboard/client",
            Destination::AdminDashboard => "/admin/dashboard",
        }
    }
}

/// Decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Redirect(Destination),
}

/// decide
///
/// The authorization predicate shared by every call site.
pub fn decide(required: RouteClass, role: Role) -> Decision {
    match (required, role) {
        (RouteClass::Public, _) => Decision::Allow,
        (RouteClass::MemberOnly, Role::Anonymous) => Decision::Redirect(Destination::SignIn),
        (RouteClass::MemberOnly, _) => Decision::Allow,
        (RouteClass::AdminOnly, Role::Administrator) => Decision::Allow,
        (RouteClass::AdminOnly, _) => Decision::Redirect(Destination::Unauthorized),
    }
}

/// Where a freshly signed-in caller lands.
pub fn landing_for(role: Role) -> Destination {
    match role {
        Role::Administrator => Destination::AdminDashboard,
        Role::Member => Destination::MemberDashboard,
        Role::Anonymous => Destination::SignIn,
    }
}

/// RouteTable
///
/// Prefix-to-class mapping. A prefix matches the path itself and anything below it
/// on a segment boundary; the longest matching prefix wins; anything unmatched is public.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteTable {
    entries: Vec<(String, RouteClass)>,
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::new(vec![
            ("/admin".to_string(), RouteClass::AdminOnly),
            ("/dashboard".to_string(), RouteClass::MemberOnly),
        ])
    }
}

impl RouteTable {
    pub fn new(entries: Vec<(String, RouteClass)>) -> Self {
        let mut entries: Vec<(String, RouteClass)> = entries
            .into_iter()
            .map(|(prefix, class)| (prefix.trim_end_matches('/').to_string(), class))
            .collect();
        // Longest first so the first match is the most specific one.
        entries.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
        Self { entries }
    }

    pub fn classify(&self, path: &str) -> RouteClass {
        self.entries
            .iter()
            .find(|(prefix, _)| prefix_matches(prefix, path))
            .map(|(_, class)| *class)
            .unwrap_or(RouteClass::Public)
    }
}

fn prefix_matches(prefix: &str, path: &str) -> bool {
    if prefix.is_empty() {
        return true;
    }
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}
