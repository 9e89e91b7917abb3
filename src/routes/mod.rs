/// Router Module Index
///
/// Routes are split by the class the access gate assigns to them. The split mirrors
/// the static route table: everything under `/admin` is admin-only, everything under
/// `/dashboard` is member-only, the rest is public.

/// Pages and API endpoints open to every visitor.
pub mod public;

/// Pages for any signed-in member. Guarded at render time only.
pub mod member;

/// Pages reserved for administrators. Guarded by the interceptor and at render time.
pub mod admin;
