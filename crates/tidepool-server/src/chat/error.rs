//! Why the coordinator refuses an inbound event.
//!
//! The wire contract is silent drop — these never reach the client. The
//! dispatch loop logs them so rejections stay observable server-side.

/// Rejection reasons for coordinator operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChatError {
    #[error("connection has no logged-in identity")]
    NotLoggedIn,
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    #[error("no such group: {0}")]
    UnknownGroup(String),
    #[error("group already exists: {0}")]
    GroupExists(String),
}
