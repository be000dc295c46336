use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

use super::{AuthState, PersistedSession, SessionError, SessionResult, SESSION_VERSION};
use crate::client::dto::UserPublic;

/// File name under the data directory
pub const SESSION_FILE: &str = "auth-storage.json";

/// Persisted, shareable auth session
#[derive(Debug)]
pub struct SessionStore {
    /// `None` keeps the session in memory only
    path: Option<PathBuf>,
    state: RwLock<AuthState>,
}

impl SessionStore {
    /// Open the session file. A missing file is a signed-out session; an
    /// unreadable one is logged and also treated as signed out.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let state = match std::fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str::<PersistedSession>(&content) {
                Ok(persisted) => normalize(persisted.state),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Corrupt session file, starting signed out");
                    AuthState::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => AuthState::default(),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Unreadable session file, starting signed out");
                AuthState::default()
            }
        };

        tracing::debug!(
            path = %path.display(),
            authenticated = state.is_authenticated,
            "Session opened"
        );

        Self {
            path: Some(path),
            state: RwLock::new(state),
        }
    }

    /// Session under `data_dir` with the standard file name
    pub fn open_in(data_dir: impl AsRef<Path>) -> Self {
        Self::open(data_dir.as_ref().join(SESSION_FILE))
    }

    /// Session that is never written to disk
    pub fn in_memory() -> Self {
        Self {
            path: None,
            state: RwLock::new(AuthState::default()),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub async fn token(&self) -> Option<String> {
        self.state.read().await.token.clone()
    }

    pub async fn user(&self) -> Option<UserPublic> {
        self.state.read().await.user.clone()
    }

    pub async fn is_authenticated(&self) -> bool {
        self.state.read().await.is_authenticated
    }

    pub async fn snapshot(&self) -> AuthState {
        self.state.read().await.clone()
    }

    /// Store a new token and mark the session authenticated
    pub async fn set_token(&self, token: impl Into<String>) -> SessionResult<()> {
        let mut state = self.state.write().await;
        state.token = Some(token.into());
        state.is_authenticated = true;
        self.persist(&state).await
    }

    pub async fn set_user(&self, user: UserPublic) -> SessionResult<()> {
        let mut state = self.state.write().await;
        state.user = Some(user);
        self.persist(&state).await
    }

    /// Sign out. The store stays usable for the next login.
    pub async fn clear(&self) -> SessionResult<()> {
        let mut state = self.state.write().await;
        *state = AuthState::default();
        self.persist(&state).await
    }

    /// Write-then-rename so a crash never leaves a torn file. Called with
    /// the write lock held, which orders concurrent updates.
    async fn persist(&self, state: &AuthState) -> SessionResult<()> {
        let path = match &self.path {
            Some(path) => path,
            None => return Ok(()),
        };

        let envelope = PersistedSession {
            state: state.clone(),
            version: SESSION_VERSION,
        };
        let json = serde_json::to_vec_pretty(&envelope)?;

        let io_err = |source| SessionError::Io {
            path: path.clone(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
        }
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &json).await.map_err(io_err)?;
        tokio::fs::rename(&tmp, path).await.map_err(io_err)?;

        tracing::debug!(path = %path.display(), "Session saved");
        Ok(())
    }
}

/// A token-less state is never authenticated
fn normalize(mut state: AuthState) -> AuthState {
    if state.token.is_none() {
        state.is_authenticated = false;
    }
    state
}
