// File: ./src/model/mod.rs
// Aggregates the split model files
pub mod item;
pub mod ordering;
pub mod parser;
pub mod timefmt;

pub use item::{
    CreateListRequest, CreateListResponse, Engagement, FingerprintBody, ItemDraft, Priority,
    SearchPage, SearchQuery, TEMP_ID_PREFIX, TodoItem, TodoList, TrendingTag, UpdateListRequest,
    WsData, WsKind, WsMessage,
};
pub use ordering::{Progress, TaskFilter, TaskSort};
pub use parser::{MAX_TAGS, normalize_tags, parse_tag_input};
