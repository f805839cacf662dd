//! Signed-in users and their sessions.
//!
//! The auth service issues the user id and tokens; this module only keeps
//! track of which browser holds which session.

pub mod session;

pub use session::{Session, SessionManager};

use serde::{Deserialize, Serialize};

/// A user as known to the auth service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Opaque id issued by the auth service; also the profile id
    pub id: String,
    pub email: String,
}

impl User {
    pub fn new(id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
        }
    }
}
