// File: ./src/model/parser.rs
// Handles smart text input parsing
use crate::model::item::{ItemDraft, Priority, TodoItem};

/// A list carries at most this many tags.
pub const MAX_TAGS: usize = 4;

impl ItemDraft {
    /// Parses `Buy milk !high #groceries` style input.
    ///
    /// `!low`, `!med`, `!medium`, `!high` and `!1`..`!3` set the priority,
    /// `#word` tokens are collected and returned (they belong to the list,
    /// not to the item). Everything else becomes the content.
    pub fn apply_smart_input(&mut self, input: &str) -> Vec<String> {
        let mut content_words = Vec::new();
        let mut tags = Vec::new();
        self.priority = None;

        for word in input.split_whitespace() {
            if let Some(p) = word.strip_prefix('!')
                && let Ok(priority) = p.parse::<Priority>()
            {
                self.priority = Some(priority);
                continue;
            }
            if let Some(tag) = word.strip_prefix('#')
                && !tag.is_empty()
            {
                tags.push(tag.to_string());
                continue;
            }
            content_words.push(word);
        }
        self.content = content_words.join(" ");
        normalize_tags(&tags)
    }
}

impl TodoItem {
    pub fn to_smart_string(&self) -> String {
        let mut s = self.content.clone();
        if self.priority != Priority::Medium {
            s.push_str(&format!(" !{}", self.priority));
        }
        s
    }
}

/// Canonical tag set: trimmed, no leading `#`, lowercase, no empties,
/// first occurrence wins, at most [`MAX_TAGS`].
pub fn normalize_tags<S: AsRef<str>>(tags: &[S]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for raw in tags {
        let tag = raw.as_ref().trim().trim_start_matches('#').trim().to_lowercase();
        if tag.is_empty() || out.contains(&tag) {
            continue;
        }
        out.push(tag);
        if out.len() == MAX_TAGS {
            break;
        }
    }
    out
}

/// Splits free text (`"rust, work  home"`) on commas and whitespace.
pub fn parse_tag_input(text: &str) -> Vec<String> {
    let parts: Vec<&str> = text
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .collect();
    normalize_tags(&parts)
}
