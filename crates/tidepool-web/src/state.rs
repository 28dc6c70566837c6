//! Shared application state for the gateway.

use std::path::PathBuf;

use tidepool_server::chat::coordinator::CoordinatorHandle;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Handle into the chat coordinator actor.
    pub coordinator: CoordinatorHandle,
    /// Directory holding `users.db`. The `/api/users` surface opens its own
    /// read connection per request.
    pub data_dir: PathBuf,
}
