//! REST surface over the identity store.

use axum::{Json, extract::State};
use serde::Serialize;
use tracing::warn;

use tidepool_server::chat::coordinator::IDENTITY_DB_FILE;
use tidepool_server::chat::identity::{IdentityDb, IdentityRecord};

use crate::state::AppState;

#[derive(Serialize)]
pub struct UsersResponse {
    users: Vec<IdentityRecord>,
}

/// `GET /api/users` — every known identity, newest first. A store failure
/// degrades to an empty list rather than a 5xx.
pub async fn list_users(State(state): State<AppState>) -> Json<UsersResponse> {
    let users = IdentityDb::open(state.data_dir.join(IDENTITY_DB_FILE))
        .and_then(|db| db.all())
        .unwrap_or_else(|e| {
            warn!("failed to read identities: {e}");
            Vec::new()
        });
    Json(UsersResponse { users })
}
