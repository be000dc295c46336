//! Application shell
//!
//! `App` owns the auth flow and navigation guard. It is created once at
//! the root and handed to whatever needs it; there is no global store.

mod forum;
mod routes;

pub use forum::ForumBoard;
pub use routes::Route;

use std::sync::Arc;
use thiserror::Error;

use crate::client::dto::{UserCreate, UserPublic};
use crate::client::{ApiClient, ClientError, ClientResult};
use crate::session::{SessionError, SessionStore};

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("Not signed in")]
    NotSignedIn,
}

impl AppError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, AppError::Client(e) if e.is_unauthorized())
    }
}

pub type AppResult<T> = Result<T, AppError>;

pub struct App {
    client: ApiClient,
    session: Arc<SessionStore>,
    current: Route,
}

impl App {
    pub fn new(client: ApiClient) -> Self {
        let session = client.session().clone();
        Self {
            client,
            session,
            current: Route::Home,
        }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    pub fn current_route(&self) -> Route {
        self.current
    }

    pub async fn is_authenticated(&self) -> bool {
        self.session.is_authenticated().await
    }

    // ========================================================================
    // AUTH
    // ========================================================================

    /// Password login. The token is only stored once the backend accepts
    /// the credentials; the profile is fetched right after.
    pub async fn login(&mut self, username: &str, password: &str) -> AppResult<Route> {
        let token = match self.client.login(username, password).await {
            Ok(token) => token,
            Err(e) => {
                tracing::info!(username, error = %e, "Login rejected");
                return Err(e.into());
            }
        };

        self.session.set_token(token.access_token).await?;
        if let Err(e) = self.refresh().await {
            tracing::warn!(username, error = %e, "Profile fetch failed after login, signing out");
            self.session.clear().await?;
            return Err(e);
        }

        tracing::info!(username, "Signed in");
        self.current = Route::Dashboard;
        Ok(Route::Dashboard)
    }

    pub async fn register(&self, username: &str, email: &str, password: &str) -> AppResult<UserPublic> {
        let body = UserCreate {
            email: email.to_string(),
            password: password.to_string(),
            username: username.to_string(),
        };
        let user = self.client.register(&body).await?;
        tracing::info!(username = %user.username, "Registered");
        Ok(user)
    }

    pub async fn logout(&mut self) -> AppResult<Route> {
        self.session.clear().await?;
        tracing::info!("Signed out");
        self.current = Route::Login;
        Ok(Route::Login)
    }

    /// Re-fetch the profile. A rejected token signs the session out.
    pub async fn refresh(&mut self) -> AppResult<UserPublic> {
        let result = self.client.me().await;
        let user = self.guard(result).await?;
        self.session.set_user(user.clone()).await?;
        Ok(user)
    }

    /// Startup validation of a persisted token. Any failure signs out
    /// quietly; returns whether the session is usable.
    pub async fn check_auth(&mut self) -> bool {
        if self.session.token().await.is_none() {
            return false;
        }

        match self.refresh().await {
            Ok(_) => true,
            Err(e) => {
                tracing::debug!(error = %e, "Stored session rejected");
                if let Err(e) = self.session.clear().await {
                    tracing::warn!(error = %e, "Failed to clear session");
                }
                false
            }
        }
    }

    /// Pass a backend result through, signing out on a 401
    pub async fn guard<T>(&mut self, result: ClientResult<T>) -> AppResult<T> {
        match result {
            Err(e) if e.is_unauthorized() => {
                tracing::info!("Token rejected by backend, signing out");
                self.session.clear().await?;
                self.current = Route::Login;
                Err(e.into())
            }
            other => other.map_err(AppError::from),
        }
    }

    // ========================================================================
    // NAVIGATION
    // ========================================================================

    /// Move to `route`, or to the login page when it needs a session
    pub async fn navigate(&mut self, route: Route) -> Route {
        let resolved = if route.is_protected() && !self.session.is_authenticated().await {
            tracing::debug!(requested = %route, "Redirecting to login");
            Route::Login
        } else {
            route
        };
        self.current = resolved;
        resolved
    }

    /// Error unless signed in; used before protected commands
    pub async fn require_session(&self) -> AppResult<()> {
        if self.session.is_authenticated().await {
            Ok(())
        } else {
            Err(AppError::NotSignedIn)
        }
    }
}
