//! Read models for the public pages and the JSON API.

use futures::future::try_join_all;
use serde::Serialize;

use crate::backend::{AlbumRecord, BackendResult, ProfileRecord, Tables};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PublishedAlbum {
    pub rank: i64,
    pub title: String,
    pub artist: String,
    pub why: String,
}

impl From<AlbumRecord> for PublishedAlbum {
    fn from(record: AlbumRecord) -> Self {
        PublishedAlbum {
            rank: record.rank,
            title: record.title,
            artist: record.artist,
            why: record.why,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PublicProfile {
    pub username: String,
    pub display_name: String,
    pub albums: Vec<PublishedAlbum>,
}

impl PublicProfile {
    fn new(profile: ProfileRecord, albums: Vec<AlbumRecord>) -> Self {
        PublicProfile {
            display_name: profile.label().to_string(),
            username: profile.username,
            albums: albums.into_iter().map(PublishedAlbum::from).collect(),
        }
    }
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct UserDirectory {
    pub users: Vec<PublicProfile>,
}

impl UserDirectory {
    pub fn with_lists(&self) -> impl Iterator<Item = &PublicProfile> {
        self.users.iter().filter(|user| !user.albums.is_empty())
    }

    pub fn without_lists(&self) -> impl Iterator<Item = &PublicProfile> {
        self.users.iter().filter(|user| user.albums.is_empty())
    }
}

/// Look a user up by username (case-insensitively). `None` when there is no
/// such user.
pub async fn public_profile(
    tables: &dyn Tables,
    username: &str,
) -> BackendResult<Option<PublicProfile>> {
    let username = username.to_lowercase();
    let Some(profile) = tables.profile_by_username(&username).await? else {
        return Ok(None);
    };

    let albums = tables.albums_for(&profile.id).await?;
    Ok(Some(PublicProfile::new(profile, albums)))
}

/// Every user with their list, ordered by display name.
pub async fn all_users(tables: &dyn Tables) -> BackendResult<UserDirectory> {
    let profiles = tables.list_profiles().await?;

    let users = try_join_all(profiles.into_iter().map(|profile| async move {
        let albums = tables.albums_for(&profile.id).await?;
        Ok::<_, crate::backend::BackendError>(PublicProfile::new(profile, albums))
    }))
    .await?;

    Ok(UserDirectory { users })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{LocalBackend, MagicLinkAuth};
    use crate::test_helpers;

    async fn seed(backend: &LocalBackend, email: &str, username: &str, name: &str, titles: &[&str]) {
        backend
            .send_magic_link(email, "http://localhost/auth/confirm")
            .await
            .unwrap();
        let link = backend.sent_links().pop().unwrap();
        let token = link.url.split("token_hash=").nth(1).unwrap().split('&').next().unwrap();
        let session = backend.verify_magic_link(token).await.unwrap();

        let profile = ProfileRecord {
            id: session.user.id.clone(),
            username: username.to_string(),
            display_name: name.to_string(),
        };
        backend
            .upsert_profile(&session.access_token, &profile)
            .await
            .unwrap();
        let rows: Vec<_> = titles
            .iter()
            .zip(1..)
            .map(|(title, rank)| AlbumRecord {
                user_id: session.user.id.clone(),
                rank,
                title: title.to_string(),
                artist: "Artist".to_string(),
                why: String::new(),
            })
            .collect();
        backend
            .insert_albums(&session.access_token, &rows)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_public_profile_lowercases_username() {
        let backend = LocalBackend::new(test_helpers::create_test_pool().await.unwrap());
        seed(&backend, "jane@example.com", "jane", "Jane", &["a", "b"]).await;

        let profile = public_profile(&backend, "JANE").await.unwrap().unwrap();
        assert_eq!(profile.display_name, "Jane");
        assert_eq!(profile.albums.len(), 2);
        assert_eq!(profile.albums[0].rank, 1);

        assert!(public_profile(&backend, "nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_display_name_falls_back_to_username() {
        let backend = LocalBackend::new(test_helpers::create_test_pool().await.unwrap());
        seed(&backend, "x@example.com", "x-user", "", &[]).await;

        let profile = public_profile(&backend, "x-user").await.unwrap().unwrap();
        assert_eq!(profile.display_name, "x-user");
    }

    #[tokio::test]
    async fn test_all_users_splits_by_list() {
        let backend = LocalBackend::new(test_helpers::create_test_pool().await.unwrap());
        seed(&backend, "b@example.com", "bea", "Bea", &["a"]).await;
        seed(&backend, "a@example.com", "al", "Al", &[]).await;

        let directory = all_users(&backend).await.unwrap();
        let names: Vec<_> = directory.users.iter().map(|u| u.display_name.as_str()).collect();
        assert_eq!(names, ["Al", "Bea"]);

        let with: Vec<_> = directory.with_lists().map(|u| u.username.as_str()).collect();
        let without: Vec<_> = directory.without_lists().map(|u| u.username.as_str()).collect();
        assert_eq!(with, ["bea"]);
        assert_eq!(without, ["al"]);
    }
}
