//! SQLite stand-in for the hosted backend.
//!
//! Mirrors the hosted contract closely enough to run the whole app on one
//! machine: the same two tables, magic links that are logged (and kept in an
//! outbox) instead of e-mailed, and access tokens checked on every write.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use sha2::{Digest, Sha256};
use sqlx::SqlitePool;
use uuid::Uuid;

use super::{
    AlbumRecord, AuthSession, BackendError, BackendResult, MagicLinkAuth, ProfileRecord, Tables,
};
use crate::auth::User;

/// Default lifetime of an unused sign-in link, in seconds.
pub const DEFAULT_LINK_TTL_SECS: i64 = 3600;

/// How many sent links the outbox remembers. Older ones are only in the log.
pub const OUTBOX_CAPACITY: usize = 64;

/// A sign-in link the local backend would have e-mailed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SentLink {
    pub email: String,
    pub url: String,
}

#[derive(Clone)]
pub struct LocalBackend {
    pool: SqlitePool,
    link_ttl_secs: i64,
    outbox: Arc<Mutex<VecDeque<SentLink>>>,
}

impl LocalBackend {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            link_ttl_secs: DEFAULT_LINK_TTL_SECS,
            outbox: Arc::new(Mutex::new(VecDeque::with_capacity(OUTBOX_CAPACITY))),
        }
    }

    pub fn with_link_ttl(mut self, secs: i64) -> Self {
        self.link_ttl_secs = secs;
        self
    }

    /// The most recent links sent, oldest first.
    pub fn sent_links(&self) -> Vec<SentLink> {
        self.outbox
            .lock()
            .map(|outbox| outbox.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Drop unused links older than the configured lifetime. Returns the number removed.
    pub async fn prune_expired_links(&self) -> BackendResult<u64> {
        let result =
            sqlx::query("DELETE FROM magic_links WHERE created_at < strftime('%s','now') - ?")
                .bind(self.link_ttl_secs)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected())
    }

    async fn authorize(&self, access_token: &str, user_id: &str) -> BackendResult<()> {
        let owner: Option<String> =
            sqlx::query_scalar("SELECT user_id FROM auth_sessions WHERE access_token = ?")
                .bind(access_token)
                .fetch_optional(&self.pool)
                .await?;

        match owner {
            Some(owner) if owner == user_id => Ok(()),
            _ => Err(BackendError::NotSignedIn),
        }
    }
}

fn random_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

fn hash_token(token: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(token.as_bytes()))
}

#[async_trait]
impl Tables for LocalBackend {
    async fn profile_by_id(&self, id: &str) -> BackendResult<Option<ProfileRecord>> {
        let record = sqlx::query_as::<_, ProfileRecord>(
            "SELECT id, username, display_name FROM profiles WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(record)
    }

    async fn profile_by_username(&self, username: &str) -> BackendResult<Option<ProfileRecord>> {
        let record = sqlx::query_as::<_, ProfileRecord>(
            "SELECT id, username, display_name FROM profiles WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(record)
    }

    async fn list_profiles(&self) -> BackendResult<Vec<ProfileRecord>> {
        let records = sqlx::query_as::<_, ProfileRecord>(
            "SELECT id, username, display_name FROM profiles ORDER BY display_name, username",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(records)
    }

    async fn albums_for(&self, user_id: &str) -> BackendResult<Vec<AlbumRecord>> {
        let records = sqlx::query_as::<_, AlbumRecord>(
            "SELECT user_id, rank, title, artist, why FROM albums WHERE user_id = ? ORDER BY rank",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(records)
    }

    async fn upsert_profile(
        &self,
        access_token: &str,
        profile: &ProfileRecord,
    ) -> BackendResult<ProfileRecord> {
        self.authorize(access_token, &profile.id).await?;

        let taken: Option<i64> =
            sqlx::query_scalar("SELECT 1 FROM profiles WHERE username = ? AND id != ? LIMIT 1")
                .bind(&profile.username)
                .bind(&profile.id)
                .fetch_optional(&self.pool)
                .await?;
        if taken.is_some() {
            return Err(BackendError::UsernameTaken);
        }

        sqlx::query(
            "INSERT INTO profiles (id, username, display_name) VALUES (?, ?, ?) \
             ON CONFLICT(id) DO UPDATE SET username = excluded.username, \
             display_name = excluded.display_name",
        )
        .bind(&profile.id)
        .bind(&profile.username)
        .bind(&profile.display_name)
        .execute(&self.pool)
        .await?;

        Ok(profile.clone())
    }

    async fn delete_albums(&self, access_token: &str, user_id: &str) -> BackendResult<()> {
        self.authorize(access_token, user_id).await?;

        sqlx::query("DELETE FROM albums WHERE user_id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn insert_albums(&self, access_token: &str, rows: &[AlbumRecord]) -> BackendResult<()> {
        let Some(first) = rows.first() else {
            return Ok(());
        };
        if rows.iter().any(|row| row.user_id != first.user_id) {
            return Err(BackendError::NotSignedIn);
        }
        self.authorize(access_token, &first.user_id).await?;

        let mut tx = self.pool.begin().await?;
        for row in rows {
            sqlx::query(
                "INSERT INTO albums (user_id, rank, title, artist, why) VALUES (?, ?, ?, ?, ?)",
            )
            .bind(&row.user_id)
            .bind(row.rank)
            .bind(&row.title)
            .bind(&row.artist)
            .bind(&row.why)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl MagicLinkAuth for LocalBackend {
    async fn send_magic_link(&self, email: &str, redirect_to: &str) -> BackendResult<()> {
        self.prune_expired_links().await?;

        let token = random_token();
        sqlx::query(
            "INSERT INTO magic_links (token_hash, email, created_at) VALUES (?, ?, strftime('%s','now'))",
        )
        .bind(hash_token(&token))
        .bind(email)
        .execute(&self.pool)
        .await?;

        let separator = if redirect_to.contains('?') { '&' } else { '?' };
        let url = format!("{redirect_to}{separator}token_hash={token}&type=magiclink");
        tracing::info!(%email, %url, "sign-in link issued (local backend, not e-mailed)");

        if let Ok(mut outbox) = self.outbox.lock() {
            if outbox.len() >= OUTBOX_CAPACITY {
                outbox.pop_front();
            }
            outbox.push_back(SentLink {
                email: email.to_string(),
                url,
            });
        }
        Ok(())
    }

    async fn verify_magic_link(&self, token_hash: &str) -> BackendResult<AuthSession> {
        let consumed: Option<(String, i64)> = sqlx::query_as(
            "DELETE FROM magic_links WHERE token_hash = ? \
             RETURNING email, CAST(strftime('%s','now') AS INTEGER) - created_at",
        )
        .bind(hash_token(token_hash))
        .fetch_optional(&self.pool)
        .await?;

        let Some((email, age_secs)) = consumed else {
            return Err(BackendError::InvalidLink);
        };
        if age_secs > self.link_ttl_secs {
            return Err(BackendError::InvalidLink);
        }

        sqlx::query("INSERT INTO auth_users (id, email) VALUES (?, ?) ON CONFLICT(email) DO NOTHING")
            .bind(Uuid::new_v4().to_string())
            .bind(&email)
            .execute(&self.pool)
            .await?;
        let user_id: String = sqlx::query_scalar("SELECT id FROM auth_users WHERE email = ?")
            .bind(&email)
            .fetch_one(&self.pool)
            .await?;

        let access_token = random_token();
        sqlx::query("INSERT INTO auth_sessions (access_token, user_id) VALUES (?, ?)")
            .bind(&access_token)
            .bind(&user_id)
            .execute(&self.pool)
            .await?;

        Ok(AuthSession {
            access_token,
            refresh_token: None,
            user: User::new(user_id, email),
        })
    }

    async fn sign_out(&self, access_token: &str) -> BackendResult<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE access_token = ?")
            .bind(access_token)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
