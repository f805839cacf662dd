//! Magic-link sign-in handlers.

use axum::extract::{Query, State};
use axum::response::{IntoResponse, Redirect, Response};
use axum::Form;
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;

use super::cookies::{SESSION_COOKIE, with_session, without_session};
use super::pages::Visit;
use super::server::AppState;
use crate::backend::BackendError;
use crate::publish::load_remote_into_draft;
use crate::toast;
use crate::validation::email::validate_email;

#[derive(Debug, Deserialize)]
pub struct MagicLinkRequest {
    #[serde(default)]
    pub email: String,
}

/// Query parameters on the link sent by email
#[derive(Debug, Deserialize)]
pub struct ConfirmParams {
    pub token_hash: String,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

/// Handler for requesting a sign-in link
pub async fn request_link(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(request): Form<MagicLinkRequest>,
) -> Response {
    let visit = Visit::begin(&state, jar);

    let email = match validate_email(&request.email) {
        Ok(email) => email,
        Err(_) => {
            state.toasts.push(&visit.visitor, toast::INVALID_EMAIL);
            return (visit.jar, Redirect::to("/app")).into_response();
        }
    };

    match state.auth.send_magic_link(&email, &state.confirm_url()).await {
        Ok(()) => {
            metrics::counter!("top10_magic_links_sent_total").increment(1);
            tracing::info!(%email, "sign-in link sent");
            state.toasts.push(&visit.visitor, toast::CHECK_EMAIL);
        }
        Err(err) => {
            tracing::error!(%email, error = %err, "failed to send sign-in link");
            state.toasts.push(&visit.visitor, toast::LINK_NOT_SENT);
        }
    }

    (visit.jar, Redirect::to("/app")).into_response()
}

/// Handler for the link itself
///
/// Exchanges the token for a session, sets the session cookie and loads
/// whatever the user already published into their draft.
pub async fn confirm(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(params): Query<ConfirmParams>,
) -> Response {
    let Visit { jar, visitor, .. } = Visit::begin(&state, jar);

    // Recovery and invite links carry token hashes too; they don't sign anyone in here.
    if let Some(kind) = params.kind.as_deref() {
        if !is_sign_in_link(kind) {
            tracing::warn!(%kind, "rejecting link of unexpected type");
            state.toasts.push(&visitor, toast::INVALID_LINK);
            return (jar, Redirect::to("/app")).into_response();
        }
    }

    let auth_session = match state.auth.verify_magic_link(&params.token_hash).await {
        Ok(auth_session) => auth_session,
        Err(BackendError::InvalidLink) => {
            state.toasts.push(&visitor, toast::INVALID_LINK);
            return (jar, Redirect::to("/app")).into_response();
        }
        Err(err) => {
            tracing::error!(error = %err, "failed to verify sign-in link");
            state.toasts.push(&visitor, toast::INVALID_LINK);
            return (jar, Redirect::to("/app")).into_response();
        }
    };

    let user = auth_session.user.clone();
    let session_id = match state.sessions.create_session(auth_session) {
        Ok(id) => id,
        Err(err) => {
            tracing::error!(error = %err, "failed to create session");
            state.toasts.push(&visitor, toast::INVALID_LINK);
            return (jar, Redirect::to("/app")).into_response();
        }
    };

    let mut draft = state.drafts.load(&visitor);
    load_remote_into_draft(state.tables.as_ref(), &user, &mut draft).await;
    if let Err(err) = state.drafts.save(&visitor, draft) {
        tracing::error!(%visitor, error = %err, "failed to save draft");
    }

    metrics::counter!("top10_sign_ins_total").increment(1);
    record_active_sessions(&state);
    tracing::info!(user_id = %user.id, "user signed in");

    (with_session(jar, session_id), Redirect::to("/app")).into_response()
}

/// Handler for signing out
pub async fn sign_out(State(state): State<AppState>, jar: CookieJar) -> Response {
    if let Some(session_id) = jar.get(SESSION_COOKIE).map(|c| c.value().to_string()) {
        match state.sessions.delete_session(&session_id) {
            Ok(Some(session)) => {
                if let Err(err) = state.auth.sign_out(&session.access_token).await {
                    tracing::warn!(error = %err, "backend sign-out failed");
                }
                tracing::info!(user_id = %session.user.id, "user signed out");
                record_active_sessions(&state);
            }
            Ok(None) => {}
            Err(err) => tracing::error!(error = %err, "failed to delete session"),
        }
    }

    (without_session(jar), Redirect::to("/")).into_response()
}

fn is_sign_in_link(kind: &str) -> bool {
    matches!(kind, "magiclink" | "email")
}

fn record_active_sessions(state: &AppState) {
    match state.sessions.session_count() {
        Ok(count) => metrics::gauge!("top10_active_sessions").set(count as f64),
        Err(err) => tracing::warn!(error = %err, "failed to count sessions"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_in_link_types() {
        assert!(is_sign_in_link("magiclink"));
        assert!(is_sign_in_link("email"));
        assert!(!is_sign_in_link("recovery"));
        assert!(!is_sign_in_link("invite"));
        assert!(!is_sign_in_link(""));
    }
}
