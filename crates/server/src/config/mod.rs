//! Configuration management
//!
//! Settings are read from a RON file (see [`loader`]) and then adjusted by
//! `TOP10_*` environment variables. Secrets never live in the file: the
//! hosted backend's anon key is named by an environment variable.

pub mod loader;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_ANON_KEY_ENV: &str = "TOP10_BACKEND_ANON_KEY";

/// Top-level configuration
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Default)]
pub struct Config {
    #[serde(default)]
    pub server: Server,

    #[serde(default)]
    pub backend: Backend,

    #[serde(default)]
    pub drafts: Drafts,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Server {
    /// Address the HTTP server listens on
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Externally visible base URL; sign-in links point back here
    #[serde(default = "default_public_url")]
    pub public_url: String,
}

impl Default for Server {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            public_url: default_public_url(),
        }
    }
}

/// Where profiles, albums and sign-in live
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub enum Backend {
    /// SQLite database on this machine; sign-in links are logged, not mailed
    Local { db_path: PathBuf },

    /// Hosted backend-as-a-service
    ///
    /// Sign-in only works if the project's magic-link email template points
    /// at this server's confirm route with the token hash in the query:
    ///
    /// ```text
    /// {{ .RedirectTo }}?token_hash={{ .TokenHash }}&type=magiclink
    /// ```
    ///
    /// `RedirectTo` is `<public_url>/auth/confirm`. The service's stock
    /// template returns tokens in the URL fragment, which never reaches the
    /// server, and such links end in an "invalid link" toast.
    Hosted {
        url: String,
        /// Environment variable holding the project's anon key
        #[serde(default = "default_anon_key_env")]
        anon_key_env: String,
    },
}

impl Default for Backend {
    fn default() -> Self {
        Backend::Local {
            db_path: PathBuf::from(".top10"),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Drafts {
    /// Root of the local draft cache
    #[serde(default = "default_drafts_dir")]
    pub dir: PathBuf,

    /// Quiet period before edits are written to disk
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

impl Drafts {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl Default for Drafts {
    fn default() -> Self {
        Self {
            dir: default_drafts_dir(),
            debounce_ms: default_debounce_ms(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0:8000".to_string()
}

fn default_public_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_anon_key_env() -> String {
    DEFAULT_ANON_KEY_ENV.to_string()
}

fn default_drafts_dir() -> PathBuf {
    PathBuf::from(".top10/drafts")
}

fn default_debounce_ms() -> u64 {
    250
}

impl Config {
    /// Apply `TOP10_*` overrides. `lookup` is `std::env::var` in production.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(bind) = lookup("TOP10_BIND") {
            self.server.bind = bind;
        }
        if let Some(public_url) = lookup("TOP10_PUBLIC_URL") {
            self.server.public_url = public_url;
        }
        if let Some(dir) = lookup("TOP10_DRAFTS_PATH") {
            self.drafts.dir = PathBuf::from(dir);
        }

        // A backend URL switches to the hosted backend; a DB path to the local one.
        if let Some(url) = lookup("TOP10_BACKEND_URL") {
            self.backend = Backend::Hosted {
                url,
                anon_key_env: default_anon_key_env(),
            };
        } else if let Some(db_path) = lookup("TOP10_DB_PATH") {
            self.backend = Backend::Local {
                db_path: PathBuf::from(db_path),
            };
        }
    }

    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Public URL without a trailing slash.
    pub fn public_base(&self) -> &str {
        self.server.public_url.trim_end_matches('/')
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.bind, "0.0.0.0:8000");
        assert_eq!(config.drafts.debounce(), Duration::from_millis(250));
        assert!(matches!(config.backend, Backend::Local { .. }));
    }

    #[test]
    fn test_backend_url_override_switches_to_hosted() {
        let env: HashMap<&str, &str> = [
            ("TOP10_BACKEND_URL", "https://project.example.co"),
            ("TOP10_BIND", "127.0.0.1:9000"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.server.bind, "127.0.0.1:9000");
        assert_eq!(
            config.backend,
            Backend::Hosted {
                url: "https://project.example.co".to_string(),
                anon_key_env: DEFAULT_ANON_KEY_ENV.to_string(),
            }
        );
    }

    #[test]
    fn test_db_path_override() {
        let mut config = Config::default();
        config.apply_overrides(|key| (key == "TOP10_DB_PATH").then(|| "/tmp/top10".to_string()));
        assert_eq!(
            config.backend,
            Backend::Local {
                db_path: PathBuf::from("/tmp/top10")
            }
        );
    }

    #[test]
    fn test_public_base_trims_slash() {
        let mut config = Config::default();
        config.server.public_url = "https://top10.example/".to_string();
        assert_eq!(config.public_base(), "https://top10.example");
    }
}
