//! The four pages: home, editor, public profile and the user directory.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum_extra::extract::cookie::CookieJar;

use super::cookies::{current_session, ensure_visitor};
use super::render::{Chrome, escape, page, profile_href};
use super::server::AppState;
use crate::auth::Session;
use crate::directory::{self, PublicProfile};
use crate::draft::{Draft, MAX_ALBUMS};
use crate::validation::slug::validate_slug;

/// Albums shown per card on the directory page.
const PREVIEW_ALBUMS: usize = 3;

/// Per-request view of who is asking.
pub(crate) struct Visit {
    pub jar: CookieJar,
    pub visitor: String,
    pub session: Option<Session>,
}

impl Visit {
    pub fn begin(state: &AppState, jar: CookieJar) -> Self {
        let session = current_session(state, &jar);
        let (jar, visitor) = ensure_visitor(jar);
        Visit {
            jar,
            visitor,
            session,
        }
    }

    fn chrome(&self, state: &AppState) -> Chrome {
        Chrome {
            signed_in: self.session.is_some(),
            toasts: state.toasts.drain(&self.visitor),
        }
    }

    fn render(self, state: &AppState, status: StatusCode, title: &str, body: &str) -> Response {
        let html = page(title, &self.chrome(state), body);
        (status, self.jar, html).into_response()
    }
}

pub async fn home(State(state): State<AppState>, jar: CookieJar) -> Response {
    let body = r#"<div class="card center">
    <h2>Share your Top 10 albums and why</h2>
    <p class="muted">Create your list, then share a clean public link.</p>
    <a class="button" href="/app">Create my list</a>
</div>"#;
    Visit::begin(&state, jar).render(&state, StatusCode::OK, "Home", body)
}

pub async fn editor(State(state): State<AppState>, jar: CookieJar) -> Response {
    let visit = Visit::begin(&state, jar);

    let body = if visit.session.is_some() {
        let draft = state.drafts.load(&visit.visitor);
        editor_body(&draft)
    } else {
        sign_in_body()
    };
    visit.render(&state, StatusCode::OK, "My list", &body)
}

fn sign_in_body() -> String {
    r#"<div class="card">
    <h2>Sign in</h2>
    <p class="muted">Enter your email and we’ll send you a magic link.</p>
    <form method="post" action="/auth/magic-link" class="row">
        <input type="email" name="email" required placeholder="you@example.com" style="flex:1">
        <button type="submit">Send link</button>
    </form>
</div>"#
        .to_string()
}

fn editor_body(draft: &Draft) -> String {
    let count = draft.albums.len();
    let last = count.saturating_sub(1);

    let rows: String = if draft.albums.is_empty() {
        r#"<div class="card center">
        <h3>No albums yet</h3>
        <p class="muted">Add up to ten albums and a short note about why you love each one.</p>
        <button name="action" value="add">Add your first album</button>
    </div>"#
            .to_string()
    } else {
        let items: String = draft
            .albums
            .iter()
            .enumerate()
            .map(|(i, album)| {
                let up_disabled = if i == 0 { " disabled" } else { "" };
                let down_disabled = if i == last { " disabled" } else { "" };
                format!(
                    r#"<li class="card">
            <div class="row" style="justify-content:space-between">
                <div class="row">
                    <span class="badge">#{rank}</span>
                    <input name="title_{i}" placeholder="Album title" value="{title}">
                    <input name="artist_{i}" placeholder="Artist" value="{artist}">
                </div>
                <div class="row">
                    <button class="outline" name="action" value="up:{i}" title="Move up"{up_disabled}>↑</button>
                    <button class="outline" name="action" value="down:{i}" title="Move down"{down_disabled}>↓</button>
                    <button class="outline" name="action" value="remove:{i}" title="Remove">✕</button>
                </div>
            </div>
            <textarea name="why_{i}" placeholder="Why this album matters to you (optional)">{why}</textarea>
        </li>"#,
                    rank = i + 1,
                    title = escape(&album.title),
                    artist = escape(&album.artist),
                    why = escape(&album.why),
                )
            })
            .collect();
        format!("<ol>{items}</ol>")
    };

    format!(
        r#"<form method="post" action="/app">
    <button type="submit" name="action" value="save" style="position:absolute;left:-9999px" tabindex="-1" aria-hidden="true">Save</button>
    <div class="row" style="justify-content:space-between;margin-bottom:24px">
        <input name="name" placeholder="Your name (used for your public page)" value="{name}" style="width:20rem">
        <div class="row">
            <a class="button outline" href="/users">Browse Users</a>
            <button name="action" value="add">+ Add album ({count}/{MAX_ALBUMS})</button>
            <button class="outline" name="action" value="clear">Clear</button>
            <button name="action" value="save" class="outline">Save draft</button>
            <button name="action" value="publish">Save &amp; Publish</button>
        </div>
    </div>
    {rows}
</form>"#,
        name = escape(&draft.name),
    )
}

pub async fn profile(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(username): Path<String>,
) -> Response {
    let visit = Visit::begin(&state, jar);
    let username = username.to_lowercase();

    if validate_slug(&username).is_err() {
        return visit.render(&state, StatusCode::NOT_FOUND, "Not found", not_found_body());
    }

    match directory::public_profile(state.tables.as_ref(), &username).await {
        Ok(Some(profile)) => {
            let title = format!("{}'s Top 10", profile.display_name);
            visit.render(&state, StatusCode::OK, &title, &profile_body(&profile))
        }
        Ok(None) => visit.render(&state, StatusCode::NOT_FOUND, "Not found", not_found_body()),
        Err(err) => {
            tracing::error!(%username, error = %err, "failed to load profile");
            visit.render(
                &state,
                StatusCode::BAD_GATEWAY,
                "Error",
                r#"<div class="card center"><p>Failed to load this list. Please try again later.</p></div>"#,
            )
        }
    }
}

fn not_found_body() -> &'static str {
    "<p>User not found.</p>"
}

fn profile_body(profile: &PublicProfile) -> String {
    let name = escape(&profile.display_name);
    let list = if profile.albums.is_empty() {
        r#"<p class="muted">No albums published yet.</p>"#.to_string()
    } else {
        let items: String = profile
            .albums
            .iter()
            .map(|album| {
                let why = if album.why.is_empty() {
                    String::new()
                } else {
                    format!(r#"<p>{}</p>"#, escape(&album.why))
                };
                format!(
                    r#"<li class="card">
            <div class="row"><span class="badge">#{}</span><strong>{}</strong><span class="muted">— {}</span></div>
            {why}
        </li>"#,
                    album.rank,
                    escape(&album.title),
                    escape(&album.artist),
                )
            })
            .collect();
        format!("<ol>{items}</ol>")
    };

    format!(
        r#"<div class="row" style="justify-content:space-between">
    <h1>{name}'s Top 10</h1>
    <a class="button outline" href="/users">Browse All Users</a>
</div>
<div class="card">
    {list}
</div>"#
    )
}

pub async fn users(State(state): State<AppState>, jar: CookieJar) -> Response {
    let visit = Visit::begin(&state, jar);

    match directory::all_users(state.tables.as_ref()).await {
        Ok(directory) => {
            let body = users_body(&directory);
            visit.render(&state, StatusCode::OK, "All Users", &body)
        }
        Err(err) => {
            tracing::error!(error = %err, "failed to load users");
            visit.render(
                &state,
                StatusCode::BAD_GATEWAY,
                "All Users",
                r#"<div class="card center">
    <p>Failed to load users. Please try again later.</p>
    <a class="button outline" href="/users">Try Again</a>
</div>"#,
            )
        }
    }
}

fn users_body(directory: &directory::UserDirectory) -> String {
    let with_lists: Vec<&PublicProfile> = directory.with_lists().collect();
    let without_lists: Vec<&PublicProfile> = directory.without_lists().collect();

    let mut body = format!(
        r#"<p class="muted"><a href="/">Home</a> / <strong>All Users</strong></p>
<div class="center">
    <h1>All Users</h1>
    <p class="muted">Discover everyone's top 10 albums and musical preferences</p>
    <p class="muted">{} users with lists · {} total users</p>
    <a class="button outline" href="/">← Back to Home</a>
</div>"#,
        with_lists.len(),
        directory.users.len(),
    );

    if !with_lists.is_empty() {
        let cards: String = with_lists.iter().map(|user| user_card(user)).collect();
        body.push_str(&format!(
            r#"<h2>Users with Published Lists</h2><div class="grid">{cards}</div>"#
        ));
    }

    if !without_lists.is_empty() {
        let cards: String = without_lists
            .iter()
            .map(|user| {
                format!(
                    r#"<div class="card row" style="justify-content:space-between"><span>{}</span><span class="badge">No albums</span></div>"#,
                    escape(&user.display_name)
                )
            })
            .collect();
        body.push_str(&format!(
            r#"<h2>Users Without Lists</h2><div class="grid">{cards}</div>"#
        ));
    }

    if directory.users.is_empty() {
        body.push_str(
            r#"<div class="card center">
    <h3>No users found</h3>
    <p class="muted">Be the first to create your top 10 albums list!</p>
    <a class="button" href="/app">Create My List</a>
</div>"#,
        );
    }

    body
}

fn user_card(user: &PublicProfile) -> String {
    let href = profile_href(&user.username);
    let preview: String = user
        .albums
        .iter()
        .take(PREVIEW_ALBUMS)
        .map(|album| {
            format!(
                r#"<div class="row"><span class="badge">#{}</span><span><strong>{}</strong> <span class="muted">— {}</span></span></div>"#,
                album.rank,
                escape(&album.title),
                escape(&album.artist),
            )
        })
        .collect();
    let more = match user.albums.len().checked_sub(PREVIEW_ALBUMS) {
        Some(extra) if extra > 0 => format!(r#"<p class="muted">+{extra} more albums</p>"#),
        _ => String::new(),
    };

    format!(
        r#"<div class="card">
    <h3><a href="{href}" title="View full profile">{name}</a></h3>
    {preview}
    {more}
    <a class="button outline" href="{href}">View Full List</a>
</div>"#,
        name = escape(&user.display_name),
    )
}
