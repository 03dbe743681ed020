//! Wire schemas for the feedback API.
//!
//! Payloads are validated here, at the gateway boundary; fields the client
//! doesn't know about are ignored rather than passed through.

use serde::{Deserialize, Serialize};

/// An authenticated user record.
///
/// Profile fields beyond id/username are opaque to the client core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Successful login payload: the session token plus the user it belongs to.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: User,
}

/// Server-defined lifecycle status of a feedback item.
///
/// Wire values are SCREAMING_SNAKE_CASE; lowercase aliases are accepted
/// since some deployments send them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FeedbackStatus {
    #[serde(alias = "open")]
    Open,
    #[serde(alias = "in_progress")]
    InProgress,
    #[serde(alias = "under_review")]
    UnderReview,
    #[serde(alias = "planned")]
    Planned,
    #[serde(alias = "completed")]
    Completed,
    #[serde(alias = "closed")]
    Closed,
}

impl FeedbackStatus {
    /// Human-readable label for table rendering.
    pub fn label(self) -> &'static str {
        match self {
            FeedbackStatus::Open => "open",
            FeedbackStatus::InProgress => "in progress",
            FeedbackStatus::UnderReview => "under review",
            FeedbackStatus::Planned => "planned",
            FeedbackStatus::Completed => "completed",
            FeedbackStatus::Closed => "closed",
        }
    }
}

impl std::fmt::Display for FeedbackStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A single feedback entry. Read-only from the client's perspective.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackItem {
    pub id: u64,
    pub title: String,
    pub upvotes: u32,
    pub status: FeedbackStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback_type: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Test: user records tolerate extra profile fields.
    #[test]
    fn test_user_ignores_unknown_fields() {
        let user: User = serde_json::from_str(
            r#"{"id":1,"username":"alice","email":"a@example.com","role":"ADMIN","avatar":null}"#,
        )
        .unwrap();
        assert_eq!(user.id, 1);
        assert_eq!(user.username, "alice");
        assert_eq!(user.email.as_deref(), Some("a@example.com"));
    }

    /// Test: feedback list parses both lowercase and server-style statuses.
    #[test]
    fn test_feedback_status_aliases() {
        let items: Vec<FeedbackItem> = serde_json::from_str(
            r#"[
                {"id":1,"title":"Add dark mode","upvotes":5,"status":"open"},
                {"id":2,"title":"Fix typo","upvotes":0,"status":"closed"},
                {"id":3,"title":"Speed up search","upvotes":12,"status":"IN_PROGRESS"}
            ]"#,
        )
        .unwrap();

        assert_eq!(items[0].status, FeedbackStatus::Open);
        assert_eq!(items[1].status, FeedbackStatus::Closed);
        assert_eq!(items[2].status, FeedbackStatus::InProgress);
    }

    /// Test: order of a parsed feedback list matches the payload order.
    #[test]
    fn test_feedback_order_preserved() {
        let items: Vec<FeedbackItem> = serde_json::from_str(
            r#"[
                {"id":2,"title":"Fix typo","upvotes":0,"status":"closed"},
                {"id":1,"title":"Add dark mode","upvotes":5,"status":"open"}
            ]"#,
        )
        .unwrap();

        let titles: Vec<&str> = items.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, ["Fix typo", "Add dark mode"]);
    }

    /// Test: negative upvote counts are rejected as malformed.
    #[test]
    fn test_negative_upvotes_rejected() {
        let result: Result<FeedbackItem, _> = serde_json::from_str(
            r#"{"id":1,"title":"Bad","upvotes":-3,"status":"open"}"#,
        );
        assert!(result.is_err());
    }

    /// Test: unknown status values are rejected rather than passed through.
    #[test]
    fn test_unknown_status_rejected() {
        let result: Result<FeedbackItem, _> = serde_json::from_str(
            r#"{"id":1,"title":"Odd","upvotes":1,"status":"ON_FIRE"}"#,
        );
        assert!(result.is_err());
    }
}
