//! Request and response bodies of the backend REST API
//!
//! Field names follow the wire format; camelCase fields are renamed
//! explicitly where the backend uses them.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ============================================================================
// AUTH & USERS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPublic {
    pub id: i64,
    pub username: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserCreate {
    pub email: String,
    pub password: String,
    pub username: String,
}

/// OAuth2 password-flow token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

// ============================================================================
// DASHBOARD
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenerResultSummary {
    pub level: String,
    pub last_assessed: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivitiesThisWeek {
    pub count: i64,
    pub change: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRate {
    pub rate: f64,
    pub period: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub screener_result: ScreenerResultSummary,
    pub activities_this_week: ActivitiesThisWeek,
    pub completion_rate: CompletionRate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressDataPoint {
    pub date: String,
    pub completed: i64,
    pub skipped: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoryWeaverRequest {
    pub situation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryStep {
    pub text: String,
    pub illustration: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryWeaverResponse {
    pub situation: String,
    pub steps: Vec<StoryStep>,
}

// ============================================================================
// SCREENER
// ============================================================================

/// Demographics plus per-question scores for the backend model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenerSubmitRequest {
    pub name: String,
    pub age: i32,
    pub sex: String,
    pub ethnicity: String,
    pub jaundice: bool,
    pub family_asd: bool,
    pub answers: Vec<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenerSubmitResponse {
    pub risk_level: String,
    pub analysis_summary: String,
    pub confidence_score: Option<f64>,
}

// ============================================================================
// FORUM
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostCreate {
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentCreate {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentPublic {
    pub id: i64,
    pub text: String,
    pub created_at: NaiveDateTime,
    pub author: UserPublic,
}

/// Post as listed on the forum page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostPublic {
    pub id: i64,
    pub title: String,
    pub excerpt: String,
    pub tags: Vec<String>,
    pub created_at: NaiveDateTime,
    pub author: UserPublic,
    pub replies: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostPublicWithComments {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
    pub created_at: NaiveDateTime,
    pub author: UserPublic,
    pub comments: Vec<CommentPublic>,
}

// ============================================================================
// RESOURCES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderPublic {
    pub id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub location: String,
    pub description: String,
    pub specialties: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NgoPublic {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LibraryItemPublic {
    pub id: i64,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationInfo {
    pub current_page: u32,
    pub total_pages: u32,
    pub total_items: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaginatedLibraryItems {
    pub data: Vec<LibraryItemPublic>,
    pub pagination: PaginationInfo,
}

/// Query for the resource library
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LibraryQuery {
    pub page: u32,
    pub limit: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub challenge: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<String>,
}

impl Default for LibraryQuery {
    fn default() -> Self {
        Self {
            page: 1,
            limit: 10,
            search: None,
            challenge: None,
            age: None,
        }
    }
}

/// Page selection for list endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageQuery {
    pub page: u32,
    pub limit: u32,
}

impl Default for PageQuery {
    fn default() -> Self {
        Self { page: 1, limit: 10 }
    }
}

/// FastAPI error body: `{"detail": "..."}`; validation errors carry a list
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ErrorDetail {
    pub detail: serde_json::Value,
}

impl ErrorDetail {
    pub fn message(&self) -> String {
        match &self.detail {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Array(items) => items
                .iter()
                .filter_map(|item| item.get("msg").and_then(|m| m.as_str()))
                .collect::<Vec<_>>()
                .join("; "),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dashboard_stats_wire_names() {
        let json = r#"{
            "screenerResult": {"level": "Low", "lastAssessed": "2024-05-01"},
            "activitiesThisWeek": {"count": 4, "change": -1},
            "completionRate": {"rate": 0.75, "period": "week"}
        }"#;
        let stats: DashboardStats = serde_json::from_str(json).unwrap();
        assert_eq!(stats.screener_result.level, "Low");
        assert_eq!(stats.activities_this_week.change, -1);
    }

    #[test]
    fn test_post_timestamp_without_zone() {
        let json = r#"{
            "id": 1, "title": "Hi", "excerpt": "Hello", "tags": ["sleep"],
            "created_at": "2024-05-01T10:20:30.123456",
            "author": {"id": 2, "username": "sam", "email": "s@x.io"},
            "replies": 3
        }"#;
        let post: PostPublic = serde_json::from_str(json).unwrap();
        assert_eq!(post.replies, 3);
        assert_eq!(post.created_at.to_string(), "2024-05-01 10:20:30.123456");
    }

    #[test]
    fn test_provider_type_field() {
        let json = r#"{"id":1,"name":"Clinic","type":"therapist","location":"Pune",
            "description":"","specialties":["ot"]}"#;
        let provider: ProviderPublic = serde_json::from_str(json).unwrap();
        assert_eq!(provider.kind, "therapist");
    }

    #[test]
    fn test_screener_response_null_confidence() {
        let json = r#"{"riskLevel":"Low","analysisSummary":"ok","confidenceScore":null}"#;
        let resp: ScreenerSubmitResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.confidence_score, None);
    }

    #[test]
    fn test_error_detail_message() {
        let plain: ErrorDetail = serde_json::from_str(r#"{"detail":"Post not found"}"#).unwrap();
        assert_eq!(plain.message(), "Post not found");

        let validation: ErrorDetail =
            serde_json::from_str(r#"{"detail":[{"msg":"field required"},{"msg":"too short"}]}"#)
                .unwrap();
        assert_eq!(validation.message(), "field required; too short");
    }

    #[test]
    fn test_library_query_skips_empty_filters() {
        let query = LibraryQuery {
            search: Some("sleep".into()),
            ..Default::default()
        };
        let value = serde_json::to_value(&query).unwrap();
        assert_eq!(value["search"], "sleep");
        assert!(value.get("age").is_none());
    }
}
