//! Access to the hosted tables and the magic-link auth service.
//!
//! Pages and the publish flow only see the [`Tables`] and [`MagicLinkAuth`]
//! traits. [`hosted::HostedBackend`] talks to the real service over HTTP;
//! [`local::LocalBackend`] keeps the same contract in SQLite for development
//! and tests.

pub mod hosted;
pub mod local;
pub mod models;

use async_trait::async_trait;
use thiserror::Error;

pub use hosted::HostedBackend;
pub use local::LocalBackend;
pub use models::{AlbumRecord, AuthSession, ProfileRecord};

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("request to backend failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("backend returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("sign-in link is invalid or has expired")]
    InvalidLink,

    #[error("username is already taken")]
    UsernameTaken,

    #[error("not signed in")]
    NotSignedIn,
}

pub type BackendResult<T> = Result<T, BackendError>;

/// Read/write access to the `profiles` and `albums` tables.
///
/// Writes carry the caller's access token; the service decides whether the
/// token may touch the row.
#[async_trait]
pub trait Tables: Send + Sync {
    async fn profile_by_id(&self, id: &str) -> BackendResult<Option<ProfileRecord>>;

    async fn profile_by_username(&self, username: &str) -> BackendResult<Option<ProfileRecord>>;

    /// Every profile, ordered by display name.
    async fn list_profiles(&self) -> BackendResult<Vec<ProfileRecord>>;

    /// A user's albums, ordered by rank.
    async fn albums_for(&self, user_id: &str) -> BackendResult<Vec<AlbumRecord>>;

    async fn upsert_profile(
        &self,
        access_token: &str,
        profile: &ProfileRecord,
    ) -> BackendResult<ProfileRecord>;

    async fn delete_albums(&self, access_token: &str, user_id: &str) -> BackendResult<()>;

    async fn insert_albums(&self, access_token: &str, rows: &[AlbumRecord]) -> BackendResult<()>;
}

/// Passwordless e-mail sign-in.
#[async_trait]
pub trait MagicLinkAuth: Send + Sync {
    /// Ask the service to e-mail a sign-in link that lands on `redirect_to`.
    async fn send_magic_link(&self, email: &str, redirect_to: &str) -> BackendResult<()>;

    /// Exchange the token carried by a clicked link for a session.
    async fn verify_magic_link(&self, token_hash: &str) -> BackendResult<AuthSession>;

    async fn sign_out(&self, access_token: &str) -> BackendResult<()>;
}
