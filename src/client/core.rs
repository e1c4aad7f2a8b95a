// File: ./src/client/core.rs
use super::cert;
use crate::model::{
    CreateListRequest, CreateListResponse, Engagement, FingerprintBody, SearchPage, SearchQuery,
    TodoList, TrendingTag, UpdateListRequest,
};
use http::header::{ACCEPT, CONTENT_TYPE};
use http::{Method, Request, Uri};
use http_body_util::BodyExt;
use hyper_rustls::HttpsConnectorBuilder;
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

type HttpsClient = Client<hyper_rustls::HttpsConnector<HttpConnector>, String>;

const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

pub const API_PREFIX: &str = "/api/v1";

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid url: {0}")]
    Url(String),
    #[error("No valid system certificates found.")]
    NoCertificates,
    #[error("request failed: {0}")]
    Transport(String),
    /// Non-success status. `message` is the user-facing text for the
    /// operation; `detail` is whatever the server put in its `error` field.
    #[error("{message}")]
    Status {
        status: u16,
        message: &'static str,
        detail: Option<String>,
    },
    #[error("unexpected response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ClientError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

pub fn encode(component: &str) -> String {
    utf8_percent_encode(component, COMPONENT).to_string()
}

/// WebSocket endpoint for `id`: `http` becomes `ws`, `https` becomes `wss`.
pub fn ws_url(base: &str, id: &str, client_id: Option<&str>) -> String {
    let base = base.trim_end_matches('/');
    let base = if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{}", rest)
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{}", rest)
    } else {
        base.to_string()
    };
    match client_id {
        Some(c) if !c.is_empty() => {
            format!("{}/ws/todos/{}?client_id={}", base, encode(id), encode(c))
        }
        _ => format!("{}/ws/todos/{}", base, encode(id)),
    }
}

#[derive(Clone, Debug)]
pub struct TodoClient {
    base: String,
    http: HttpsClient,
}

impl TodoClient {
    pub fn new(base_url: &str, insecure: bool) -> Result<Self, ClientError> {
        let base = base_url.trim().trim_end_matches('/').to_string();
        let uri: Uri = base
            .parse()
            .map_err(|e: http::uri::InvalidUri| ClientError::Url(e.to_string()))?;
        let https = match uri.scheme_str() {
            Some("https") => true,
            Some("http") => false,
            _ => return Err(ClientError::Url(format!("unsupported scheme in {}", base))),
        };

        let connector = HttpsConnectorBuilder::new()
            .with_tls_config(cert::tls_config(https, insecure)?)
            .https_or_http()
            .enable_http1()
            .build();
        let http = Client::builder(TokioExecutor::new()).build(connector);

        Ok(Self { base, http })
    }

    pub fn base_url(&self) -> &str {
        &self.base
    }

    pub fn ws_url(&self, id: &str, client_id: Option<&str>) -> String {
        ws_url(&self.base, id, client_id)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<String>,
        failure: &'static str,
    ) -> Result<T, ClientError> {
        let uri = format!("{}{}", self.base, path);
        let mut builder = Request::builder()
            .method(method)
            .uri(&uri)
            .header(ACCEPT, "application/json");
        if body.is_some() {
            builder = builder.header(CONTENT_TYPE, "application/json");
        }
        let req = builder
            .body(body.unwrap_or_default())
            .map_err(|e| ClientError::Url(e.to_string()))?;

        let resp = self
            .http
            .request(req)
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;
        let status = resp.status();
        let bytes = resp
            .into_body()
            .collect()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?
            .to_bytes();

        if !status.is_success() {
            let detail = serde_json::from_slice::<ErrorBody>(&bytes)
                .ok()
                .map(|b| b.error);
            tracing::debug!(%uri, status = status.as_u16(), ?detail, "request failed");
            return Err(ClientError::Status {
                status: status.as_u16(),
                message: failure,
                detail,
            });
        }
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub async fn health(&self) -> bool {
        let req = match Request::get(format!("{}/health", self.base)).body(String::new()) {
            Ok(r) => r,
            Err(_) => return false,
        };
        matches!(self.http.request(req).await, Ok(r) if r.status().is_success())
    }

    pub async fn create(&self, req: &CreateListRequest) -> Result<CreateListResponse, ClientError> {
        let body = serde_json::to_string(req)?;
        self.send(
            Method::POST,
            &format!("{}/todos", API_PREFIX),
            Some(body),
            "Failed to create todo list",
        )
        .await
    }

    pub async fn get(&self, id: &str) -> Result<TodoList, ClientError> {
        self.send(
            Method::GET,
            &format!("{}/todos/{}", API_PREFIX, encode(id)),
            None,
            "Failed to load todo list",
        )
        .await
    }

    pub async fn update(
        &self,
        id: &str,
        edit_token: &str,
        client_id: Option<&str>,
        req: &UpdateListRequest,
    ) -> Result<TodoList, ClientError> {
        let mut path = format!(
            "{}/todos/{}?token={}",
            API_PREFIX,
            encode(id),
            encode(edit_token)
        );
        if let Some(c) = client_id
            && !c.is_empty()
        {
            path.push_str(&format!("&client_id={}", encode(c)));
        }
        let body = serde_json::to_string(req)?;
        self.send(Method::PUT, &path, Some(body), "Failed to save changes")
            .await
    }

    pub async fn duplicate(&self, id: &str) -> Result<CreateListResponse, ClientError> {
        self.send(
            Method::POST,
            &format!("{}/todos/{}/duplicate", API_PREFIX, encode(id)),
            None,
            "Failed to duplicate todo list",
        )
        .await
    }

    pub async fn search(&self, query: &SearchQuery) -> Result<SearchPage, ClientError> {
        let mut params = Vec::new();
        if let Some(s) = query.search.as_deref()
            && !s.trim().is_empty()
        {
            params.push(format!("search={}", encode(s.trim())));
        }
        if !query.tags.is_empty() {
            params.push(format!("tags={}", encode(&query.tags.join(","))));
        }
        if let Some(c) = query.cursor.as_deref()
            && !c.is_empty()
        {
            params.push(format!("cursor={}", encode(c)));
        }
        if let Some(limit) = query.limit {
            params.push(format!("limit={}", limit));
        }
        let mut path = format!("{}/todos", API_PREFIX);
        if !params.is_empty() {
            path.push('?');
            path.push_str(&params.join("&"));
        }
        self.send(Method::GET, &path, None, "Failed to search todo lists")
            .await
    }

    pub async fn trending(&self, limit: Option<usize>) -> Result<Vec<TrendingTag>, ClientError> {
        let path = match limit {
            Some(l) => format!("{}/tags/trending?limit={}", API_PREFIX, l),
            None => format!("{}/tags/trending", API_PREFIX),
        };
        self.send(Method::GET, &path, None, "Failed to load trending tags")
            .await
    }

    async fn engage(
        &self,
        method: Method,
        id: &str,
        what: &str,
        fingerprint: &str,
        failure: &'static str,
    ) -> Result<Engagement, ClientError> {
        let body = serde_json::to_string(&FingerprintBody {
            fingerprint: fingerprint.to_string(),
        })?;
        self.send(
            method,
            &format!("{}/todos/{}/{}", API_PREFIX, encode(id), what),
            Some(body),
            failure,
        )
        .await
    }

    pub async fn record_view(&self, id: &str, fingerprint: &str) -> Result<Engagement, ClientError> {
        self.engage(Method::POST, id, "views", fingerprint, "Failed to record view")
            .await
    }

    pub async fn like(&self, id: &str, fingerprint: &str) -> Result<Engagement, ClientError> {
        self.engage(Method::POST, id, "likes", fingerprint, "Failed to like todo list")
            .await
    }

    pub async fn unlike(&self, id: &str, fingerprint: &str) -> Result<Engagement, ClientError> {
        self.engage(
            Method::DELETE,
            id,
            "likes",
            fingerprint,
            "Failed to unlike todo list",
        )
        .await
    }
}
