use axum::{
    extract::{OriginalUri, Query, State},
    http::{HeaderMap, Uri},
    response::Html,
};
use chrono::Utc;

use crate::{
    access::RouteTable,
    calendar::CalendarState,
    cookies,
    guard::{PageView, RenderGuard},
    models::{CalendarEvent, Principal},
    ui::{UiEvent, UiQuery, UiState},
};

const CLUB_NAME: &str = "Agility Club";
const CALENDAR_PAGE_EVENTS: u32 = 20;

// --- Layout ---

/// Minimal HTML escaping for values that come from outside (emails, event titles).
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Wraps a page body in the site chrome, driven by the page's UI state. The menu links
/// carry the state they lead to in their query string.
pub fn layout(title: &str, ui: &UiState, body: &str) -> String {
    let body_class = if ui.scroll_locked() { "scroll-locked" } else { "" };
    let close_nav = if ui.nav_open {
        format!(
            r#"<a class="nav-close" href="{}">Close</a> "#,
            escape(&ui.after(UiEvent::CloseNav).href())
        )
    } else {
        String::new()
    };
    format!(
        r#"<!doctype html>
<html lang="fr">
<head><meta charset="utf-8"><title>{title} · {CLUB_NAME}</title></head>
<body class="{body_class}">
<a class="nav-toggle" href="{toggle}" aria-controls="site-nav">Menu</a>
<nav id="site-nav" aria-expanded="{nav_open}">
{close_nav}<a href="/">Home</a> <a href="/calendar">Calendar</a> <a href="/dashboard/client">Members</a> <a href="/signup">Join</a> <a href="/login">Sign in</a>
</nav>
<main>
{body}
</main>
</body>
</html>"#,
        title = escape(title),
        toggle = escape(&ui.after(UiEvent::ToggleNav).href()),
        nav_open = ui.nav_open,
    )
}

fn page(title: &str, query: UiQuery, body: &str) -> Html<String> {
    let store = query.into_store();
    Html(layout(title, &store.state(), body))
}

/// Runs the Render Guard for one page request and renders the outcome. The required
/// class comes from the same route table the interceptor reads, looked up with the
/// full request path. The mount lives as long as this future: if the client goes
/// away, the resolution is aborted.
async fn guarded<F>(
    guard: &RenderGuard,
    routes: &RouteTable,
    uri: &Uri,
    headers: &HeaderMap,
    content: F,
) -> PageView
where
    F: FnOnce(&Principal) -> String,
{
    let required = routes.classify(uri.path());
    let mut mount = guard.mount(required, cookies::session_token(headers));
    mount.settled().await;
    mount.view(content)
}

// --- Public Pages ---

pub async fn home(Query(query): Query<UiQuery>) -> Html<String> {
    page(
        "Home",
        query,
        r#"<h1>Welcome to the club</h1>
<p>Agility, obedience and canicross training for every dog and handler.</p>
<p><a href="/calendar">See upcoming events</a> or <a href="/signup">become a member</a>.</p>"#,
    )
}

pub async fn calendar_page(
    State(calendar): State<CalendarState>,
    Query(query): Query<UiQuery>,
) -> Html<String> {
    let body = match calendar.upcoming_events(Utc::now(), CALENDAR_PAGE_EVENTS).await {
        Ok(events) if events.is_empty() => "<h1>Calendar</h1>\n<p>No upcoming events.</p>".to_string(),
        Ok(events) => format!("<h1>Calendar</h1>\n<ul class=\"events\">\n{}</ul>", render_events(&events)),
        Err(e) => {
            tracing::warn!(error = %e, "calendar unavailable");
            "<h1>Calendar</h1>\n<p>The calendar is unavailable right now.</p>".to_string()
        }
    };
    page("Calendar", query, &body)
}

fn render_events(events: &[CalendarEvent]) -> String {
    events
        .iter()
        .map(|event| {
            let location = event
                .location
                .as_deref()
                .map(|l| format!(" · {}", escape(l)))
                .unwrap_or_default();
            format!(
                "<li><time datetime=\"{start}\">{start}</time> {summary}{location}</li>\n",
                start = escape(&event.start),
                summary = escape(&event.summary),
            )
        })
        .collect()
}

pub async fn login_page(Query(query): Query<UiQuery>) -> Html<String> {
    page(
        "Sign in",
        query,
        r#"<h1>Sign in</h1>
<form id="signin" data-endpoint="/api/auth/signin">
<input type="email" name="email" required> <input type="password" name="password" required>
<button type="submit">Sign in</button>
</form>
<p><a href="/reset-password">Forgot your password?</a></p>"#,
    )
}

pub async fn signup_page(Query(query): Query<UiQuery>) -> Html<String> {
    page(
        "Join",
        query,
        r#"<h1>Become a member</h1>
<form id="signup" data-endpoint="/api/auth/signup">
<input type="email" name="email" required> <input type="password" name="password" minlength="6" required>
<button type="submit">Create account</button>
</form>"#,
    )
}

pub async fn reset_password_page(Query(query): Query<UiQuery>) -> Html<String> {
    page(
        "Reset password",
        query,
        r#"<h1>Reset your password</h1>
<form id="reset" data-endpoint="/api/auth/reset">
<input type="email" name="email" required>
<button type="submit">Send reset link</button>
</form>
<form id="new-password" data-endpoint="/api/auth/password">
<input type="password" name="password" minlength="6" required>
<button type="submit">Set new password</button>
</form>"#,
    )
}

pub async fn unauthorized_page(Query(query): Query<UiQuery>) -> Html<String> {
    page(
        "Unauthorized",
        query,
        r#"<h1>Access denied</h1>
<p>This area is reserved for the club's administrators.</p>
<p><a href="/dashboard/client">Back to the member area</a></p>"#,
    )
}

// --- Guarded Pages ---

pub async fn member_dashboard(
    State(guard): State<RenderGuard>,
    State(routes): State<RouteTable>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    Query(query): Query<UiQuery>,
) -> PageView {
    let ui = query.into_store().state();
    guarded(&guard, &routes, &uri, &headers, |principal| {
        let mut body = format!(
            r#"<h1>Member area</h1>
<p>Signed in as {email}.</p>
<ul><li><a href="/calendar">Training calendar</a></li><li><a href="/reset-password">Change password</a></li></ul>
<a class="sign-out" href="{confirm}">Sign out</a>"#,
            email = escape(&principal.email),
            confirm = escape(&ui.after(UiEvent::OpenModal).href()),
        );
        if ui.modal_open {
            body.push_str(&sign_out_dialog(&ui));
        }
        layout("Member area", &ui, &body)
    })
    .await
}

pub async fn admin_dashboard(
    State(guard): State<RenderGuard>,
    State(routes): State<RouteTable>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    Query(query): Query<UiQuery>,
) -> PageView {
    let ui = query.into_store().state();
    guarded(&guard, &routes, &uri, &headers, |principal| {
        let body = format!(
            r#"<h1>Administration</h1>
<p>Signed in as {email} (administrator).</p>
<ul><li><a href="/calendar">Manage events</a></li><li><a href="/dashboard/client">Member view</a></li></ul>"#,
            email = escape(&principal.email),
        );
        layout("Administration", &ui, &body)
    })
    .await
}

/// Sign-out confirmation, shown while the page's modal is open.
fn sign_out_dialog(ui: &UiState) -> String {
    format!(
        r#"
<dialog open aria-modal="true">
<p>Sign out of the club site?</p>
<form data-endpoint="/api/auth/signout"><button type="submit">Sign out</button></form>
<a class="dialog-cancel" href="{cancel}">Cancel</a>
</dialog>"#,
        cancel = escape(&ui.after(UiEvent::CloseModal).href()),
    )
}
