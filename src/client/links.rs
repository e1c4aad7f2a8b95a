// File: ./src/client/links.rs
use super::core::encode;

/// The two links handed out for a list. The edit link carries the token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareLinks {
    pub view: String,
    pub edit: Option<String>,
}

impl ShareLinks {
    pub fn new(web_base: &str, id: &str, edit_token: Option<&str>) -> Self {
        let view = format!("{}/todo/{}", web_base.trim_end_matches('/'), encode(id));
        let edit = edit_token
            .filter(|t| !t.is_empty())
            .map(|t| format!("{}?token={}", view, encode(t)));
        Self { view, edit }
    }
}
