//! Backend REST API client
//!
//! One method per endpoint, each returning the typed body. The bearer
//! token is read from the shared session on every request, so a login or
//! logout elsewhere takes effect on the next call.

use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use super::dto::*;
use super::error::{ClientError, ClientResult};
use crate::session::SessionStore;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000/api/v1";

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API root including the version prefix
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    config: ClientConfig,
    session: Arc<SessionStore>,
}

impl ApiClient {
    pub fn new(config: ClientConfig, session: Arc<SessionStore>) -> ClientResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(ClientError::Request)?;

        Ok(Self {
            client,
            config,
            session,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    // ------------------------------------------------------------------
    // Auth & users
    // ------------------------------------------------------------------

    /// OAuth2 password login (form encoded)
    pub async fn login(&self, username: &str, password: &str) -> ClientResult<TokenResponse> {
        let builder = self
            .request(Method::POST, "/auth/login/token")
            .await
            .form(&[("username", username), ("password", password)]);
        self.send(builder).await
    }

    pub async fn register(&self, user: &UserCreate) -> ClientResult<UserPublic> {
        let builder = self.request(Method::POST, "/auth/register").await.json(user);
        self.send(builder).await
    }

    /// Profile of the session's user
    pub async fn me(&self) -> ClientResult<UserPublic> {
        self.get("/users/me").await
    }

    /// Profile for an explicit token, ignoring the session
    pub async fn me_with_token(&self, token: &str) -> ClientResult<UserPublic> {
        let builder = self
            .client
            .get(self.url("/users/me"))
            .bearer_auth(token);
        self.send(builder).await
    }

    // ------------------------------------------------------------------
    // Dashboard
    // ------------------------------------------------------------------

    pub async fn dashboard_stats(&self) -> ClientResult<DashboardStats> {
        self.get("/dashboard/stats").await
    }

    pub async fn dashboard_progress(&self) -> ClientResult<Vec<ProgressDataPoint>> {
        self.get("/dashboard/progress").await
    }

    pub async fn story_weaver(&self, situation: &str) -> ClientResult<StoryWeaverResponse> {
        let body = StoryWeaverRequest {
            situation: situation.to_string(),
        };
        self.post("/dashboard/story-weaver", &body).await
    }

    // ------------------------------------------------------------------
    // Screener
    // ------------------------------------------------------------------

    pub async fn submit_screener(
        &self,
        request: &ScreenerSubmitRequest,
    ) -> ClientResult<ScreenerSubmitResponse> {
        self.post("/screener/submit", request).await
    }

    // ------------------------------------------------------------------
    // Forum
    // ------------------------------------------------------------------

    pub async fn list_posts(&self, page: PageQuery) -> ClientResult<Vec<PostPublic>> {
        let builder = self
            .request(Method::GET, "/forum/posts")
            .await
            .query(&page);
        self.send(builder).await
    }

    pub async fn create_post(&self, post: &PostCreate) -> ClientResult<PostPublicWithComments> {
        self.post("/forum/posts", post).await
    }

    pub async fn get_post(&self, id: i64) -> ClientResult<PostPublicWithComments> {
        self.get(&format!("/forum/posts/{id}")).await
    }

    pub async fn add_comment(&self, post_id: i64, text: &str) -> ClientResult<CommentPublic> {
        let body = CommentCreate {
            text: text.to_string(),
        };
        self.post(&format!("/forum/posts/{post_id}/comments"), &body)
            .await
    }

    // ------------------------------------------------------------------
    // Resources
    // ------------------------------------------------------------------

    /// Providers, optionally filtered by type (e.g. `therapist`)
    pub async fn providers(&self, kind: Option<&str>) -> ClientResult<Vec<ProviderPublic>> {
        let mut builder = self.request(Method::GET, "/resources/providers").await;
        if let Some(kind) = kind {
            builder = builder.query(&[("type", kind)]);
        }
        self.send(builder).await
    }

    pub async fn ngos(&self) -> ClientResult<Vec<NgoPublic>> {
        self.get("/resources/ngos").await
    }

    pub async fn library(&self, query: &LibraryQuery) -> ClientResult<PaginatedLibraryItems> {
        let builder = self
            .request(Method::GET, "/resources/library")
            .await
            .query(query);
        self.send(builder).await
    }

    // ------------------------------------------------------------------
    // Plumbing
    // ------------------------------------------------------------------

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// Builder with the session's bearer token attached, when there is one
    async fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.client.request(method, self.url(path));
        match self.session.token().await {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        let builder = self.request(Method::GET, path).await;
        self.send(builder).await
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> ClientResult<T> {
        let builder = self.request(Method::POST, path).await.json(body);
        self.send(builder).await
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> ClientResult<T> {
        let response = builder.send().await?;
        let response = check_status(response).await?;
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| ClientError::Decode(e.to_string()))
    }
}

/// Map non-success statuses to errors, extracting FastAPI's `detail`
async fn check_status(response: Response) -> ClientResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let url = response.url().path().to_string();
    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorDetail>(&text)
        .map(|d| d.message())
        .unwrap_or_else(|_| {
            if text.is_empty() {
                status.canonical_reason().unwrap_or("").to_string()
            } else {
                text
            }
        });

    tracing::debug!(status = status.as_u16(), path = %url, message = %message, "Backend returned error");

    Err(match status {
        StatusCode::UNAUTHORIZED => ClientError::Unauthorized(message),
        StatusCode::NOT_FOUND => ClientError::NotFound(message),
        _ => ClientError::Api {
            status: status.as_u16(),
            message,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::mock::{self, MockBackend};

    async fn client_for(backend: &MockBackend) -> ApiClient {
        let config = ClientConfig {
            base_url: backend.base_url.clone(),
            timeout: Duration::from_millis(500),
        };
        ApiClient::new(config, Arc::new(SessionStore::in_memory())).unwrap()
    }

    async fn signed_in(backend: &MockBackend) -> ApiClient {
        let client = client_for(backend).await;
        client.session().set_token(mock::TOKEN).await.unwrap();
        client
    }

    #[tokio::test]
    async fn test_login_returns_token() {
        let backend = mock::spawn().await;
        let client = client_for(&backend).await;
        let token = client.login(mock::USERNAME, mock::PASSWORD).await.unwrap();
        assert_eq!(token.access_token, mock::TOKEN);
        assert_eq!(token.token_type, "bearer");
    }

    #[tokio::test]
    async fn test_bad_credentials_unauthorized() {
        let backend = mock::spawn().await;
        let client = client_for(&backend).await;
        let err = client.login(mock::USERNAME, "wrong").await.unwrap_err();
        match err {
            ClientError::Unauthorized(message) => {
                assert_eq!(message, "Incorrect username or password")
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_bearer_attached_from_session() {
        let backend = mock::spawn().await;
        let client = client_for(&backend).await;
        assert!(client.me().await.unwrap_err().is_unauthorized());

        client.session().set_token(mock::TOKEN).await.unwrap();
        let me = client.me().await.unwrap();
        assert_eq!(me.username, mock::USERNAME);

        client.session().clear().await.unwrap();
        assert!(client.me().await.unwrap_err().is_unauthorized());
    }

    #[tokio::test]
    async fn test_me_with_explicit_token() {
        let backend = mock::spawn().await;
        let client = client_for(&backend).await;
        assert!(client.me_with_token(mock::TOKEN).await.is_ok());
        assert!(client.me_with_token("forged").await.is_err());
    }

    #[tokio::test]
    async fn test_register_conflict_is_api_error() {
        let backend = mock::spawn().await;
        let client = client_for(&backend).await;

        let taken = UserCreate {
            email: "a@x.io".into(),
            password: "pw".into(),
            username: mock::USERNAME.into(),
        };
        let err = client.register(&taken).await.unwrap_err();
        assert_eq!(err.status(), Some(409));

        let fresh = UserCreate {
            username: "grace".into(),
            ..taken
        };
        assert_eq!(client.register(&fresh).await.unwrap().username, "grace");
    }

    #[tokio::test]
    async fn test_dashboard_endpoints() {
        let backend = mock::spawn().await;
        let client = signed_in(&backend).await;
        let stats = client.dashboard_stats().await.unwrap();
        assert_eq!(stats.screener_result.level, "Low");
        assert_eq!(client.dashboard_progress().await.unwrap().len(), 7);

        let story = client.story_weaver("going to the dentist").await.unwrap();
        assert_eq!(story.situation, "going to the dentist");
        assert!(!story.steps.is_empty());
    }

    #[tokio::test]
    async fn test_forum_roundtrip() {
        let backend = mock::spawn().await;
        let client = signed_in(&backend).await;

        let created = client
            .create_post(&PostCreate {
                title: "Bedtime routines".into(),
                content: "What works for you?".into(),
                tags: vec!["sleep".into()],
            })
            .await
            .unwrap();

        let comment = client.add_comment(created.id, "Visual schedules").await.unwrap();
        assert_eq!(comment.author.username, mock::USERNAME);

        let post = client.get_post(created.id).await.unwrap();
        assert_eq!(post.comments.len(), 1);

        let listed = client.list_posts(PageQuery::default()).await.unwrap();
        assert!(listed.iter().any(|p| p.id == created.id && p.replies == 1));
    }

    #[tokio::test]
    async fn test_missing_post_not_found() {
        let backend = mock::spawn().await;
        let client = signed_in(&backend).await;
        match client.get_post(999).await.unwrap_err() {
            ClientError::NotFound(message) => assert_eq!(message, "Post not found"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_resources() {
        let backend = mock::spawn().await;
        let client = signed_in(&backend).await;

        assert_eq!(client.providers(None).await.unwrap().len(), 2);
        let therapists = client.providers(Some("therapist")).await.unwrap();
        assert_eq!(therapists.len(), 1);
        assert_eq!(therapists[0].kind, "therapist");

        assert_eq!(client.ngos().await.unwrap().len(), 1);

        let page = client
            .library(&LibraryQuery {
                page: 2,
                limit: 2,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(page.pagination.current_page, 2);
        assert_eq!(page.pagination.total_items, 5);
        assert_eq!(page.pagination.total_pages, 3);
        assert_eq!(page.data.len(), 2);
    }

    #[tokio::test]
    async fn test_screener_submit() {
        let backend = mock::spawn().await;
        let client = signed_in(&backend).await;
        let response = client
            .submit_screener(&ScreenerSubmitRequest {
                name: "Kid".into(),
                age: 4,
                sex: "m".into(),
                ethnicity: "unknown".into(),
                jaundice: false,
                family_asd: false,
                answers: vec![2, 2, 2, 1, 0],
            })
            .await
            .unwrap();
        assert_eq!(response.risk_level, "High");
    }

    #[tokio::test]
    async fn test_timeout() {
        let backend = mock::spawn().await;
        let client = client_for(&backend).await;
        let result: ClientResult<serde_json::Value> = client.get("/slow").await;
        assert!(matches!(result, Err(ClientError::Timeout)));
    }

    #[tokio::test]
    async fn test_connection_refused_unavailable() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let config = ClientConfig {
            base_url: format!("http://{addr}/api/v1"),
            timeout: Duration::from_secs(2),
        };
        let client = ApiClient::new(config, Arc::new(SessionStore::in_memory())).unwrap();
        assert!(matches!(client.ngos().await, Err(ClientError::Unavailable)));
    }

    #[tokio::test]
    async fn test_malformed_body_decode_error() {
        let backend = mock::spawn().await;
        let client = client_for(&backend).await;
        let result: ClientResult<UserPublic> = client.get("/garbage").await;
        assert!(matches!(result, Err(ClientError::Decode(_))));
    }
}
