//! In-memory session storage.
//!
//! Sessions live as long as the process; a restart signs everybody out.

use super::User;
use crate::backend::AuthSession;
use anyhow::Result;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

/// Represents an active session
#[derive(Debug, Clone)]
pub struct Session {
    /// Value of the session cookie
    pub id: String,
    /// Authenticated user
    pub user: User,
    /// Access token presented on writes to the backend
    pub access_token: String,
    pub refresh_token: Option<String>,
}

#[derive(Clone)]
pub struct SessionManager {
    sessions: Arc<RwLock<HashMap<String, Session>>>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Store a verified auth session and return the new session id
    pub fn create_session(&self, auth: AuthSession) -> Result<String> {
        let session_id = Uuid::new_v4().to_string();
        let session = Session {
            id: session_id.clone(),
            user: auth.user,
            access_token: auth.access_token,
            refresh_token: auth.refresh_token,
        };

        let mut sessions = self
            .sessions
            .write()
            .map_err(|e| anyhow::anyhow!("Failed to acquire session lock: {}", e))?;
        sessions.insert(session_id.clone(), session);

        Ok(session_id)
    }

    pub fn get_session(&self, session_id: &str) -> Result<Option<Session>> {
        let sessions = self
            .sessions
            .read()
            .map_err(|e| anyhow::anyhow!("Failed to acquire session lock: {}", e))?;

        Ok(sessions.get(session_id).cloned())
    }

    /// Remove a session (sign out). Returns the removed session, if any.
    pub fn delete_session(&self, session_id: &str) -> Result<Option<Session>> {
        let mut sessions = self
            .sessions
            .write()
            .map_err(|e| anyhow::anyhow!("Failed to acquire session lock: {}", e))?;
        Ok(sessions.remove(session_id))
    }

    pub fn session_count(&self) -> Result<usize> {
        let sessions = self
            .sessions
            .read()
            .map_err(|e| anyhow::anyhow!("Failed to acquire session lock: {}", e))?;

        Ok(sessions.len())
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn auth_session(id: &str, token: &str) -> AuthSession {
        AuthSession {
            access_token: token.to_string(),
            refresh_token: None,
            user: User::new(id, format!("{id}@example.com")),
        }
    }

    #[test]
    fn test_create_and_get_session() {
        let manager = SessionManager::new();

        let session_id = manager.create_session(auth_session("user-1", "token123")).unwrap();

        let session = manager.get_session(&session_id).unwrap();
        assert!(session.is_some());

        let session = session.unwrap();
        assert_eq!(session.user.id, "user-1");
        assert_eq!(session.access_token, "token123");
    }

    #[test]
    fn test_multiple_concurrent_sessions() {
        let manager = SessionManager::new();

        let session_id1 = manager.create_session(auth_session("user-1", "token1")).unwrap();
        let session_id2 = manager.create_session(auth_session("user-2", "token2")).unwrap();

        assert_ne!(session_id1, session_id2);
        assert_eq!(manager.get_session(&session_id1).unwrap().unwrap().user.id, "user-1");
        assert_eq!(manager.get_session(&session_id2).unwrap().unwrap().user.id, "user-2");
        assert_eq!(manager.session_count().unwrap(), 2);
    }

    #[test]
    fn test_delete_session() {
        let manager = SessionManager::new();

        let session_id1 = manager.create_session(auth_session("user-1", "token1")).unwrap();
        let session_id2 = manager.create_session(auth_session("user-2", "token2")).unwrap();

        let removed = manager.delete_session(&session_id1).unwrap();
        assert_eq!(removed.map(|s| s.access_token), Some("token1".to_string()));

        assert!(manager.get_session(&session_id1).unwrap().is_none());
        assert!(manager.get_session(&session_id2).unwrap().is_some());
        assert_eq!(manager.session_count().unwrap(), 1);
    }

    #[test]
    fn test_invalid_session_id() {
        let manager = SessionManager::new();
        manager.create_session(auth_session("user-1", "token1")).unwrap();

        assert!(manager.get_session("invalid-id").unwrap().is_none());
        assert!(manager.delete_session("invalid-id").unwrap().is_none());
    }
}
