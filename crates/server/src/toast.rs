//! One-line notifications shown on the next page a visitor loads.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

/// How long a toast stays relevant (and on screen).
pub const TOAST_TTL: Duration = Duration::from_millis(2400);

pub const CLEARED: &str = "Cleared.";
pub const ADD_AN_ALBUM: &str = "Add at least one album.";
pub const PROFILE_NOT_SAVED: &str = "Couldn't save profile.";
pub const ALBUMS_NOT_SAVED: &str = "Couldn't save albums.";
pub const PUBLISHED: &str = "Published!";
pub const SIGN_IN_TO_PUBLISH: &str = "Please sign in to publish.";
pub const CHECK_EMAIL: &str = "Check your email for a sign-in link.";
pub const INVALID_EMAIL: &str = "Please enter a valid email address.";
pub const LINK_NOT_SENT: &str = "Couldn't send the sign-in link.";
pub const INVALID_LINK: &str = "That sign-in link is invalid or has expired.";

#[derive(Clone, Debug)]
struct Toast {
    text: String,
    pushed_at: Instant,
}

#[derive(Clone)]
pub struct ToastBoard {
    ttl: Duration,
    pending: Arc<RwLock<HashMap<String, Vec<Toast>>>>,
}

impl ToastBoard {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            pending: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn push(&self, visitor: &str, text: impl Into<String>) {
        let toast = Toast {
            text: text.into(),
            pushed_at: Instant::now(),
        };
        let mut pending = match self.pending.write() {
            Ok(pending) => pending,
            Err(err) => {
                tracing::warn!(error = %err, "dropping toast");
                return;
            }
        };

        // Visitors who never load another page would otherwise stay forever.
        pending.retain(|_, toasts| {
            toasts.retain(|toast| toast.pushed_at.elapsed() < self.ttl);
            !toasts.is_empty()
        });
        pending.entry(visitor.to_string()).or_default().push(toast);
    }

    /// Take the visitor's toasts that have not expired yet, oldest first.
    pub fn drain(&self, visitor: &str) -> Vec<String> {
        let Ok(mut pending) = self.pending.write() else {
            return Vec::new();
        };
        let Some(toasts) = pending.remove(visitor) else {
            return Vec::new();
        };

        toasts
            .into_iter()
            .filter(|toast| toast.pushed_at.elapsed() < self.ttl)
            .map(|toast| toast.text)
            .collect()
    }
}

impl Default for ToastBoard {
    fn default() -> Self {
        Self::new(TOAST_TTL)
    }
}
