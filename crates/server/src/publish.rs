//! Moving a draft to and from the hosted tables.

use thiserror::Error;

use crate::auth::{Session, User};
use crate::backend::{BackendError, ProfileRecord, Tables};
use crate::draft::Draft;
use crate::toast;
use crate::validation::slug::slugify;

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("not signed in")]
    NotSignedIn,

    #[error("the list has no albums")]
    NoAlbums,

    #[error("failed to save profile: {0}")]
    Profile(#[source] BackendError),

    #[error("failed to save albums: {0}")]
    Albums(#[source] BackendError),
}

impl PublishError {
    /// The message shown to the visitor.
    pub fn toast(&self) -> &'static str {
        match self {
            PublishError::NotSignedIn => toast::SIGN_IN_TO_PUBLISH,
            PublishError::NoAlbums => toast::ADD_AN_ALBUM,
            PublishError::Profile(_) => toast::PROFILE_NOT_SAVED,
            PublishError::Albums(_) => toast::ALBUMS_NOT_SAVED,
        }
    }

    fn outcome(&self) -> &'static str {
        match self {
            PublishError::NotSignedIn => "not_signed_in",
            PublishError::NoAlbums => "no_albums",
            PublishError::Profile(_) => "profile_failed",
            PublishError::Albums(_) => "albums_failed",
        }
    }
}

/// Publish the draft as the signed-in user's list and return the username
/// it is now reachable under.
///
/// The profile is upserted first; the user's stored albums are then
/// deleted and replaced by the draft rows, ranked 1..N in draft order.
pub async fn publish(
    tables: &dyn Tables,
    session: Option<&Session>,
    draft: &Draft,
) -> Result<String, PublishError> {
    let result = publish_inner(tables, session, draft).await;
    let outcome = match &result {
        Ok(_) => "published",
        Err(err) => err.outcome(),
    };
    metrics::counter!("top10_publish_total", "outcome" => outcome).increment(1);
    result
}

async fn publish_inner(
    tables: &dyn Tables,
    session: Option<&Session>,
    draft: &Draft,
) -> Result<String, PublishError> {
    let session = session.ok_or(PublishError::NotSignedIn)?;
    let username = slugify(&draft.name);

    if draft.albums.is_empty() {
        return Err(PublishError::NoAlbums);
    }

    let display_name = if draft.name.trim().is_empty() {
        username.clone()
    } else {
        draft.name.clone()
    };
    let profile = ProfileRecord {
        id: session.user.id.clone(),
        username: username.clone(),
        display_name,
    };

    tables
        .upsert_profile(&session.access_token, &profile)
        .await
        .map_err(|err| {
            tracing::error!(user_id = %profile.id, error = %err, "failed to save profile");
            PublishError::Profile(err)
        })?;

    let rows = draft.ranked_rows(&session.user.id);
    tables
        .delete_albums(&session.access_token, &session.user.id)
        .await
        .map_err(PublishError::Albums)?;
    tables
        .insert_albums(&session.access_token, &rows)
        .await
        .map_err(|err| {
            tracing::error!(user_id = %profile.id, error = %err, "failed to save albums");
            PublishError::Albums(err)
        })?;

    tracing::info!(%username, albums = rows.len(), "list published");
    Ok(username)
}

/// Refresh a signed-in user's draft from what they already published.
/// Backend failures are logged and leave the draft as it was.
pub async fn load_remote_into_draft(tables: &dyn Tables, user: &User, draft: &mut Draft) {
    let profile = match tables.profile_by_id(&user.id).await {
        Ok(profile) => profile,
        Err(err) => {
            tracing::warn!(user_id = %user.id, error = %err, "failed to load profile");
            return;
        }
    };
    let albums = match tables.albums_for(&user.id).await {
        Ok(albums) => albums,
        Err(err) => {
            tracing::warn!(user_id = %user.id, error = %err, "failed to load albums");
            return;
        }
    };

    draft.replace_from_remote(profile.as_ref(), &albums);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{LocalBackend, MagicLinkAuth};
    use crate::draft::{AlbumPatch, Direction};
    use crate::test_helpers;

    async fn signed_in(backend: &LocalBackend, email: &str) -> Session {
        backend
            .send_magic_link(email, "http://localhost/auth/confirm")
            .await
            .unwrap();
        let link = backend.sent_links().pop().unwrap();
        let token = url::Url::parse(&link.url)
            .unwrap()
            .query_pairs()
            .find(|(k, _)| k == "token_hash")
            .map(|(_, v)| v.into_owned())
            .unwrap();
        let auth = backend.verify_magic_link(&token).await.unwrap();
        Session {
            id: "s".to_string(),
            user: auth.user,
            access_token: auth.access_token,
            refresh_token: None,
        }
    }

    fn draft(name: &str, titles: &[&str]) -> Draft {
        let mut draft = Draft {
            name: name.to_string(),
            albums: Vec::new(),
        };
        for (i, title) in titles.iter().enumerate() {
            draft.add_blank();
            draft.update_album(
                i,
                AlbumPatch {
                    title: Some(title.to_string()),
                    artist: Some("Artist".to_string()),
                    why: None,
                },
            );
        }
        draft
    }

    #[tokio::test]
    async fn test_requires_session() {
        let backend = LocalBackend::new(test_helpers::create_test_pool().await.unwrap());
        let err = publish(&backend, None, &draft("Jane", &["a"])).await.unwrap_err();
        assert!(matches!(err, PublishError::NotSignedIn));
        assert_eq!(err.toast(), toast::SIGN_IN_TO_PUBLISH);
    }

    #[tokio::test]
    async fn test_requires_an_album() {
        let backend = LocalBackend::new(test_helpers::create_test_pool().await.unwrap());
        let session = signed_in(&backend, "jane@example.com").await;

        let err = publish(&backend, Some(&session), &draft("Jane", &[]))
            .await
            .unwrap_err();
        assert!(matches!(err, PublishError::NoAlbums));
        assert!(backend.profile_by_id(&session.user.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_publish_replaces_previous_list() {
        let backend = LocalBackend::new(test_helpers::create_test_pool().await.unwrap());
        let session = signed_in(&backend, "jane@example.com").await;

        let first = draft("Jane Doe", &["a", "b", "c"]);
        let username = publish(&backend, Some(&session), &first).await.unwrap();
        assert_eq!(username, "jane-doe");

        let mut second = draft("Jane Doe", &["x", "y"]);
        second.move_album(1, Direction::Up);
        publish(&backend, Some(&session), &second).await.unwrap();

        let stored: Vec<_> = backend
            .albums_for(&session.user.id)
            .await
            .unwrap()
            .into_iter()
            .map(|a| (a.rank, a.title))
            .collect();
        assert_eq!(stored, [(1, "y".to_string()), (2, "x".to_string())]);

        let profile = backend.profile_by_username("jane-doe").await.unwrap().unwrap();
        assert_eq!(profile.display_name, "Jane Doe");
        assert_eq!(profile.id, session.user.id);
    }

    #[tokio::test]
    async fn test_empty_name_publishes_as_me() {
        let backend = LocalBackend::new(test_helpers::create_test_pool().await.unwrap());
        let session = signed_in(&backend, "anon@example.com").await;

        let username = publish(&backend, Some(&session), &draft("", &["a"]))
            .await
            .unwrap();
        assert_eq!(username, "me");
        let profile = backend.profile_by_username("me").await.unwrap().unwrap();
        assert_eq!(profile.display_name, "me");
    }

    #[tokio::test]
    async fn test_taken_username_fails_on_profile() {
        let backend = LocalBackend::new(test_helpers::create_test_pool().await.unwrap());
        let alice = signed_in(&backend, "alice@example.com").await;
        let bob = signed_in(&backend, "bob@example.com").await;

        publish(&backend, Some(&alice), &draft("Sam", &["a"])).await.unwrap();
        let err = publish(&backend, Some(&bob), &draft("Sam", &["b"]))
            .await
            .unwrap_err();
        assert!(matches!(err, PublishError::Profile(BackendError::UsernameTaken)));
        assert_eq!(err.toast(), toast::PROFILE_NOT_SAVED);
    }

    #[tokio::test]
    async fn test_load_remote_into_draft() {
        let backend = LocalBackend::new(test_helpers::create_test_pool().await.unwrap());
        let session = signed_in(&backend, "jane@example.com").await;
        publish(&backend, Some(&session), &draft("Jane", &["a", "b"]))
            .await
            .unwrap();

        let mut local = draft("", &["stale"]);
        load_remote_into_draft(&backend, &session.user, &mut local).await;
        assert_eq!(local.name, "Jane");
        let titles: Vec<_> = local.albums.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(titles, ["a", "b"]);
    }
}
