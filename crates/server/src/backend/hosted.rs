//! Client for the hosted backend-as-a-service.
//!
//! Tables are reached through the service's PostgREST interface
//! (`/rest/v1/<table>`), sign-in through its GoTrue interface (`/auth/v1`).
//! Every request carries the project's anon key; writes additionally carry
//! the signed-in user's access token so row-level policies apply.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use url::Url;

use super::{
    AlbumRecord, AuthSession, BackendError, BackendResult, MagicLinkAuth, ProfileRecord, Tables,
};
use crate::auth::User;

const PROFILE_COLUMNS: &str = "id,username,display_name";
const ALBUM_COLUMNS: &str = "user_id,rank,title,artist,why";

#[derive(Clone)]
pub struct HostedBackend {
    base_url: Url,
    anon_key: String,
    http_client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct VerifyResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    user: VerifiedUser,
}

#[derive(Debug, Deserialize)]
struct VerifiedUser {
    id: String,
    #[serde(default)]
    email: Option<String>,
}

impl HostedBackend {
    pub fn new(base_url: Url, anon_key: impl Into<String>) -> Result<Self> {
        Ok(Self {
            base_url,
            anon_key: anon_key.into(),
            http_client: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .context("Failed to create HTTP client")?,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.as_str().trim_end_matches('/'), path)
    }

    fn request(&self, method: Method, path: &str, bearer: Option<&str>) -> RequestBuilder {
        self.http_client
            .request(method, self.endpoint(path))
            .header("apikey", &self.anon_key)
            .bearer_auth(bearer.unwrap_or(&self.anon_key))
    }

    async fn select<T>(&self, table: &str, query: &[(&str, String)]) -> BackendResult<Vec<T>>
    where
        T: for<'de> Deserialize<'de>,
    {
        let response = self
            .request(Method::GET, &format!("rest/v1/{table}"), None)
            .query(query)
            .send()
            .await?;
        Ok(check_status(response).await?.json().await?)
    }
}

/// Turn a non-2xx response into [`BackendError::Status`].
async fn check_status(response: Response) -> BackendResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = response.text().await.unwrap_or_default();
    Err(BackendError::Status {
        status: status.as_u16(),
        message,
    })
}

fn eq(value: &str) -> String {
    format!("eq.{value}")
}

#[async_trait]
impl Tables for HostedBackend {
    async fn profile_by_id(&self, id: &str) -> BackendResult<Option<ProfileRecord>> {
        let rows = self
            .select::<ProfileRecord>(
                "profiles",
                &[("select", PROFILE_COLUMNS.into()), ("id", eq(id))],
            )
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn profile_by_username(&self, username: &str) -> BackendResult<Option<ProfileRecord>> {
        let rows = self
            .select::<ProfileRecord>(
                "profiles",
                &[("select", PROFILE_COLUMNS.into()), ("username", eq(username))],
            )
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn list_profiles(&self) -> BackendResult<Vec<ProfileRecord>> {
        self.select(
            "profiles",
            &[
                ("select", PROFILE_COLUMNS.into()),
                ("order", "display_name.asc".into()),
            ],
        )
        .await
    }

    async fn albums_for(&self, user_id: &str) -> BackendResult<Vec<AlbumRecord>> {
        self.select(
            "albums",
            &[
                ("select", ALBUM_COLUMNS.into()),
                ("user_id", eq(user_id)),
                ("order", "rank.asc".into()),
            ],
        )
        .await
    }

    async fn upsert_profile(
        &self,
        access_token: &str,
        profile: &ProfileRecord,
    ) -> BackendResult<ProfileRecord> {
        let response = self
            .request(Method::POST, "rest/v1/profiles", Some(access_token))
            .header("Prefer", "resolution=merge-duplicates,return=representation")
            .json(profile)
            .send()
            .await?;

        if response.status() == StatusCode::CONFLICT {
            return Err(BackendError::UsernameTaken);
        }

        let rows: Vec<ProfileRecord> = check_status(response).await?.json().await?;
        Ok(rows.into_iter().next().unwrap_or_else(|| profile.clone()))
    }

    async fn delete_albums(&self, access_token: &str, user_id: &str) -> BackendResult<()> {
        let response = self
            .request(Method::DELETE, "rest/v1/albums", Some(access_token))
            .query(&[("user_id", eq(user_id))])
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }

    async fn insert_albums(&self, access_token: &str, rows: &[AlbumRecord]) -> BackendResult<()> {
        if rows.is_empty() {
            return Ok(());
        }

        let response = self
            .request(Method::POST, "rest/v1/albums", Some(access_token))
            .header("Prefer", "return=minimal")
            .json(rows)
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }
}

#[async_trait]
impl MagicLinkAuth for HostedBackend {
    async fn send_magic_link(&self, email: &str, redirect_to: &str) -> BackendResult<()> {
        let response = self
            .request(Method::POST, "auth/v1/otp", None)
            .query(&[("redirect_to", redirect_to)])
            .json(&json!({ "email": email, "create_user": true }))
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }

    async fn verify_magic_link(&self, token_hash: &str) -> BackendResult<AuthSession> {
        let response = self
            .request(Method::POST, "auth/v1/verify", None)
            .json(&json!({ "type": "magiclink", "token_hash": token_hash }))
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::FORBIDDEN
            || status == StatusCode::UNAUTHORIZED
            || status == StatusCode::NOT_FOUND
        {
            return Err(BackendError::InvalidLink);
        }

        let verified: VerifyResponse = check_status(response).await?.json().await?;
        Ok(AuthSession {
            access_token: verified.access_token,
            refresh_token: verified.refresh_token,
            user: User::new(verified.user.id, verified.user.email.unwrap_or_default()),
        })
    }

    async fn sign_out(&self, access_token: &str) -> BackendResult<()> {
        let response = self
            .request(Method::POST, "auth/v1/logout", Some(access_token))
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }
}
