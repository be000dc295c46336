//! Typed client for the backend REST API
//!
//! # Endpoints
//!
//! - `POST /auth/login/token`, `POST /auth/register`, `GET /users/me`
//! - `GET /dashboard/stats`, `GET /dashboard/progress`, `POST /dashboard/story-weaver`
//! - `POST /screener/submit`
//! - `GET|POST /forum/posts`, `GET /forum/posts/{id}`, `POST /forum/posts/{id}/comments`
//! - `GET /resources/providers`, `GET /resources/ngos`, `GET /resources/library`

mod api_client;
pub mod dto;
pub mod error;

#[cfg(test)]
pub(crate) mod mock;

pub use api_client::{ApiClient, ClientConfig, DEFAULT_BASE_URL};
pub use error::{ClientError, ClientResult};
