// File: ./src/model/item.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Prefix used for items that only exist locally until the server assigns an id.
pub const TEMP_ID_PREFIX: &str = "temp-";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub fn label(self) -> &'static str {
        match self {
            Priority::Low => "Low",
            Priority::Medium => "Med",
            Priority::High => "High",
        }
    }

    fn rank(self) -> u8 {
        match self {
            Priority::Low => 0,
            Priority::Medium => 1,
            Priority::High => 2,
        }
    }
}

impl PartialOrd for Priority {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Priority {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank().cmp(&other.rank())
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        };
        f.write_str(s)
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" | "l" | "3" => Ok(Priority::Low),
            "medium" | "med" | "m" | "2" => Ok(Priority::Medium),
            "high" | "h" | "1" => Ok(Priority::High),
            other => Err(format!("unknown priority '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TodoItem {
    pub id: String,
    pub content: String,
    pub completed: bool,
    pub order: u32,
    #[serde(default)]
    pub priority: Priority,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl TodoItem {
    pub fn is_temporary(&self) -> bool {
        self.id.is_empty() || self.id.starts_with(TEMP_ID_PREFIX)
    }

    /// The request shape for this item, as sent back on update.
    pub fn to_draft(&self) -> ItemDraft {
        ItemDraft {
            id: Some(self.id.clone()),
            content: self.content.clone(),
            completed: self.completed,
            priority: Some(self.priority),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TodoList {
    pub id: String,
    #[serde(default)]
    pub title: String,
    pub items: Vec<TodoItem>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    #[serde(default)]
    pub view_count: u64,
    #[serde(default)]
    pub like_count: u64,
}

impl TodoList {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    pub fn drafts(&self) -> Vec<ItemDraft> {
        self.items.iter().map(TodoItem::to_draft).collect()
    }
}

/// Item as accepted in create/update requests. Server-owned fields
/// (`created_at`, `completed_at`, `order`) are ignored when present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ItemDraft {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
}

impl ItemDraft {
    pub fn new(content: &str) -> Self {
        Self {
            content: content.to_string(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CreateListRequest {
    #[serde(default)]
    pub expiration_hours: i64,
    #[serde(default)]
    pub items: Vec<ItemDraft>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateListResponse {
    pub id: String,
    pub edit_token: String,
    pub todo_list: TodoList,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct UpdateListRequest {
    #[serde(default)]
    pub items: Vec<ItemDraft>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl UpdateListRequest {
    /// Full-list push, the way every local edit is sent.
    pub fn from_list(list: &TodoList) -> Self {
        Self {
            items: list.drafts(),
            tags: None,
            title: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendingTag {
    pub name: String,
    pub usage_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SearchQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchPage {
    pub lists: Vec<TodoList>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

/// View/like counters returned by the engagement endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Engagement {
    pub view_count: u64,
    pub like_count: u64,
    /// Whether this call changed the record (new view, new like, removed like).
    pub counted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FingerprintBody {
    pub fingerprint: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WsKind {
    Connected,
    Update,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WsData {
    List(TodoList),
    Status { status: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WsMessage {
    #[serde(rename = "type")]
    pub kind: WsKind,
    pub todo_id: String,
    pub client_id: String,
    pub data: WsData,
}

impl WsMessage {
    pub fn connected(todo_id: &str, client_id: &str) -> Self {
        Self {
            kind: WsKind::Connected,
            todo_id: todo_id.to_string(),
            client_id: client_id.to_string(),
            data: WsData::Status {
                status: "connected".to_string(),
            },
        }
    }

    pub fn update(list: &TodoList, updated_by: &str) -> Self {
        Self {
            kind: WsKind::Update,
            todo_id: list.id.clone(),
            client_id: updated_by.to_string(),
            data: WsData::List(list.clone()),
        }
    }
}
