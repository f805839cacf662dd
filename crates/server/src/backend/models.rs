use serde::{Deserialize, Deserializer, Serialize};

use crate::auth::User;

/// Row of the `profiles` table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProfileRecord {
    pub id: String,
    pub username: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub display_name: String,
}

impl ProfileRecord {
    /// Display name, or the username when none was given.
    pub fn label(&self) -> &str {
        if self.display_name.trim().is_empty() {
            &self.username
        } else {
            &self.display_name
        }
    }
}

/// Row of the `albums` table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct AlbumRecord {
    pub user_id: String,
    pub rank: i64,
    pub title: String,
    pub artist: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub why: String,
}

/// The hosted tables return `null` for unset text columns.
fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Session handed out by the auth service after a magic link is verified.
#[derive(Clone, Debug)]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub user: User,
}
