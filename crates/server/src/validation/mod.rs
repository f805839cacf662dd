pub mod email;
pub mod slug;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("username must be lowercase kebab-case")]
    InvalidSlug,
    #[error("please enter a valid email address")]
    InvalidEmail,
}
