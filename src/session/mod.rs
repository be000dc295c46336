//! Auth session
//!
//! The session is the bearer token plus the profile of the signed-in user.
//! It is persisted as `auth-storage.json` in the data directory so a login
//! survives restarts, and is shared as `Arc<SessionStore>` between the app
//! shell and the API client.

mod store;

pub use store::{SessionStore, SESSION_FILE};

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

use crate::client::dto::UserPublic;

/// Authentication state
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthState {
    pub token: Option<String>,
    pub user: Option<UserPublic>,
    pub is_authenticated: bool,
}

impl AuthState {
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
            user: None,
            is_authenticated: true,
        }
    }
}

/// On-disk envelope: `{"state": {...}, "version": 0}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct PersistedSession {
    pub state: AuthState,
    #[serde(default)]
    pub version: u32,
}

pub(crate) const SESSION_VERSION: u32 = 0;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Session file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode session: {0}")]
    Encode(#[from] serde_json::Error),
}

pub type SessionResult<T> = Result<T, SessionError>;
