//! In-process stand-in for the backend, bound to an ephemeral port

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::dto::*;

pub const USERNAME: &str = "ada";
pub const PASSWORD: &str = "secret";
pub const TOKEN: &str = "token-ada";
/// Account whose credentials are accepted but whose profile lookup fails
pub const FLAKY_USERNAME: &str = "flaky";
pub const FLAKY_TOKEN: &str = "token-flaky";

pub struct MockBackend {
    pub base_url: String,
    pub state: Arc<MockState>,
}

#[derive(Default)]
pub struct MockState {
    posts: Mutex<Vec<PostPublicWithComments>>,
    next_id: AtomicI64,
}

impl MockState {
    pub fn post_count(&self) -> usize {
        self.posts.lock().map(|p| p.len()).unwrap_or(0)
    }
}

pub async fn spawn() -> MockBackend {
    let state = Arc::new(MockState {
        posts: Mutex::new(Vec::new()),
        next_id: AtomicI64::new(1),
    });

    let api = Router::new()
        .route("/auth/login/token", post(login))
        .route("/auth/register", post(register))
        .route("/users/me", get(me))
        .route("/dashboard/stats", get(stats))
        .route("/dashboard/progress", get(progress))
        .route("/dashboard/story-weaver", post(story))
        .route("/screener/submit", post(screener))
        .route("/forum/posts", get(list_posts).post(create_post))
        .route("/forum/posts/:id", get(get_post))
        .route("/forum/posts/:id/comments", post(create_comment))
        .route("/resources/providers", get(providers))
        .route("/resources/ngos", get(ngos))
        .route("/resources/library", get(library))
        .route("/slow", get(slow))
        .route("/garbage", get(garbage))
        .with_state(state.clone());

    let app = Router::new().nest("/api/v1", api);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    MockBackend {
        base_url: format!("http://{addr}/api/v1"),
        state,
    }
}

fn user() -> UserPublic {
    UserPublic {
        id: 1,
        username: USERNAME.into(),
        email: "ada@example.com".into(),
    }
}

fn detail(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "detail": message }))).into_response()
}

fn authorize(headers: &HeaderMap) -> Result<UserPublic, Response> {
    let expected = format!("Bearer {TOKEN}");
    match headers.get("authorization").and_then(|v| v.to_str().ok()) {
        Some(value) if value == expected => Ok(user()),
        _ => Err(detail(
            StatusCode::UNAUTHORIZED,
            "Could not validate credentials",
        )),
    }
}

#[derive(Deserialize)]
struct LoginForm {
    username: String,
    password: String,
}

async fn login(Form(form): Form<LoginForm>) -> Response {
    if form.username == USERNAME && form.password == PASSWORD {
        Json(json!({ "access_token": TOKEN, "token_type": "bearer" })).into_response()
    } else if form.username == FLAKY_USERNAME && form.password == PASSWORD {
        Json(json!({ "access_token": FLAKY_TOKEN, "token_type": "bearer" })).into_response()
    } else {
        detail(StatusCode::UNAUTHORIZED, "Incorrect username or password")
    }
}

async fn register(Json(body): Json<UserCreate>) -> Response {
    if body.username == USERNAME {
        return detail(StatusCode::CONFLICT, "Username already registered");
    }
    let created = UserPublic {
        id: 2,
        username: body.username,
        email: body.email,
    };
    (StatusCode::CREATED, Json(created)).into_response()
}

async fn me(headers: HeaderMap) -> Response {
    let flaky = format!("Bearer {FLAKY_TOKEN}");
    if headers.get("authorization").and_then(|v| v.to_str().ok()) == Some(flaky.as_str()) {
        return detail(StatusCode::INTERNAL_SERVER_ERROR, "Profile service unavailable");
    }
    match authorize(&headers) {
        Ok(user) => Json(user).into_response(),
        Err(resp) => resp,
    }
}

async fn stats(headers: HeaderMap) -> Response {
    if let Err(resp) = authorize(&headers) {
        return resp;
    }
    Json(json!({
        "screenerResult": { "level": "Low", "lastAssessed": "2024-05-01" },
        "activitiesThisWeek": { "count": 5, "change": 2 },
        "completionRate": { "rate": 0.8, "period": "this week" }
    }))
    .into_response()
}

async fn progress(headers: HeaderMap) -> Response {
    if let Err(resp) = authorize(&headers) {
        return resp;
    }
    let days = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];
    let points: Vec<ProgressDataPoint> = days
        .iter()
        .enumerate()
        .map(|(i, d)| ProgressDataPoint {
            date: d.to_string(),
            completed: i as i64,
            skipped: 1,
        })
        .collect();
    Json(points).into_response()
}

async fn story(headers: HeaderMap, Json(body): Json<StoryWeaverRequest>) -> Response {
    if let Err(resp) = authorize(&headers) {
        return resp;
    }
    Json(StoryWeaverResponse {
        steps: vec![
            StoryStep {
                text: format!("Today I am {}.", body.situation),
                illustration: "calm".into(),
            },
            StoryStep {
                text: "I can take deep breaths.".into(),
                illustration: "breathing".into(),
            },
        ],
        situation: body.situation,
    })
    .into_response()
}

async fn screener(headers: HeaderMap, Json(body): Json<ScreenerSubmitRequest>) -> Response {
    if let Err(resp) = authorize(&headers) {
        return resp;
    }
    let score: i32 = body.answers.iter().sum();
    let level = if score > 6 { "High" } else { "Low" };
    Json(ScreenerSubmitResponse {
        risk_level: level.into(),
        analysis_summary: format!("Score {score}"),
        confidence_score: Some(0.9),
    })
    .into_response()
}

async fn list_posts(State(state): State<Arc<MockState>>) -> Response {
    let posts = state.posts.lock().unwrap();
    let listed: Vec<PostPublic> = posts
        .iter()
        .rev()
        .map(|p| PostPublic {
            id: p.id,
            title: p.title.clone(),
            excerpt: p.content.chars().take(100).collect(),
            tags: p.tags.clone(),
            created_at: p.created_at,
            author: p.author.clone(),
            replies: p.comments.len() as i64,
        })
        .collect();
    Json(listed).into_response()
}

async fn create_post(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(body): Json<PostCreate>,
) -> Response {
    let author = match authorize(&headers) {
        Ok(user) => user,
        Err(resp) => return resp,
    };
    let post = PostPublicWithComments {
        id: state.next_id.fetch_add(1, Ordering::SeqCst),
        title: body.title,
        content: body.content,
        tags: body.tags,
        created_at: chrono::Utc::now().naive_utc(),
        author,
        comments: Vec::new(),
    };
    state.posts.lock().unwrap().push(post.clone());
    (StatusCode::CREATED, Json(post)).into_response()
}

async fn get_post(State(state): State<Arc<MockState>>, Path(id): Path<i64>) -> Response {
    let posts = state.posts.lock().unwrap();
    match posts.iter().find(|p| p.id == id) {
        Some(post) => Json(post.clone()).into_response(),
        None => detail(StatusCode::NOT_FOUND, "Post not found"),
    }
}

async fn create_comment(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(body): Json<CommentCreate>,
) -> Response {
    let author = match authorize(&headers) {
        Ok(user) => user,
        Err(resp) => return resp,
    };
    let comment_id = state.next_id.fetch_add(1, Ordering::SeqCst);
    let mut posts = state.posts.lock().unwrap();
    match posts.iter_mut().find(|p| p.id == id) {
        Some(post) => {
            let comment = CommentPublic {
                id: comment_id,
                text: body.text,
                created_at: chrono::Utc::now().naive_utc(),
                author,
            };
            post.comments.push(comment.clone());
            (StatusCode::CREATED, Json(comment)).into_response()
        }
        None => detail(StatusCode::NOT_FOUND, "Post not found"),
    }
}

#[derive(Deserialize)]
struct ProviderParams {
    #[serde(rename = "type")]
    kind: Option<String>,
}

async fn providers(Query(params): Query<ProviderParams>) -> Response {
    let all = vec![
        ProviderPublic {
            id: 1,
            name: "Bright Steps Clinic".into(),
            kind: "therapist".into(),
            location: "Pune".into(),
            description: "Occupational therapy".into(),
            specialties: vec!["sensory".into()],
        },
        ProviderPublic {
            id: 2,
            name: "Dr. Rao".into(),
            kind: "pediatrician".into(),
            location: "Mumbai".into(),
            description: "Developmental pediatrics".into(),
            specialties: vec!["assessment".into()],
        },
    ];
    let filtered: Vec<ProviderPublic> = all
        .into_iter()
        .filter(|p| params.kind.as_deref().map_or(true, |k| p.kind == k))
        .collect();
    Json(filtered).into_response()
}

async fn ngos() -> Response {
    Json(vec![NgoPublic {
        id: 1,
        name: "Action for Autism".into(),
        description: "Parent support".into(),
        position: Position {
            lat: 28.6,
            lng: 77.2,
        },
    }])
    .into_response()
}

#[derive(Deserialize)]
struct LibraryParams {
    page: u32,
    limit: u32,
}

async fn library(Query(params): Query<LibraryParams>) -> Response {
    let total = 5u32;
    let items: Vec<LibraryItemPublic> = (1..=total)
        .map(|i| LibraryItemPublic {
            id: i as i64,
            title: format!("Guide {i}"),
            kind: "article".into(),
            description: String::new(),
            tags: vec![],
        })
        .skip(((params.page - 1) * params.limit) as usize)
        .take(params.limit as usize)
        .collect();
    Json(PaginatedLibraryItems {
        data: items,
        pagination: PaginationInfo {
            current_page: params.page,
            total_pages: total.div_ceil(params.limit),
            total_items: total,
        },
    })
    .into_response()
}

async fn slow() -> Response {
    tokio::time::sleep(Duration::from_secs(5)).await;
    Json(json!({})).into_response()
}

async fn garbage() -> Response {
    Json(json!({ "unexpected": true })).into_response()
}
