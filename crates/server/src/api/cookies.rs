//! The two cookies the app sets.
//!
//! `top10_visitor` identifies a browser (its draft and toasts) whether or
//! not anyone is signed in; `top10_session` points at a signed-in session.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use uuid::Uuid;

use super::server::AppState;
use crate::auth::Session;

pub const VISITOR_COOKIE: &str = "top10_visitor";
pub const SESSION_COOKIE: &str = "top10_session";

fn build(name: &'static str, value: String) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

/// The visitor id from the jar, issuing a fresh one when it is missing or
/// was not issued by us.
pub fn ensure_visitor(jar: CookieJar) -> (CookieJar, String) {
    let existing = jar
        .get(VISITOR_COOKIE)
        .and_then(|cookie| Uuid::parse_str(cookie.value()).ok());

    match existing {
        Some(id) => (jar, id.hyphenated().to_string()),
        None => {
            let id = Uuid::new_v4().to_string();
            (jar.add(build(VISITOR_COOKIE, id.clone())), id)
        }
    }
}

pub fn current_session(state: &AppState, jar: &CookieJar) -> Option<Session> {
    let session_id = jar.get(SESSION_COOKIE)?.value().to_string();
    match state.sessions.get_session(&session_id) {
        Ok(session) => session,
        Err(err) => {
            tracing::warn!(error = %err, "failed to read session");
            None
        }
    }
}

pub fn with_session(jar: CookieJar, session_id: String) -> CookieJar {
    jar.add(build(SESSION_COOKIE, session_id))
}

pub fn without_session(jar: CookieJar) -> CookieJar {
    jar.remove(Cookie::build(SESSION_COOKIE).path("/"))
}
