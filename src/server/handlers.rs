// File: ./src/server/handlers.rs
use super::AppState;
use crate::error::ListError;
use crate::model::{
    CreateListRequest, CreateListResponse, Engagement, FingerprintBody, SearchPage, SearchQuery,
    TodoList, TrendingTag, UpdateListRequest, parse_tag_input,
};
use crate::service::ListService;
use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

/// A failed request: status plus the message placed in `{"error": ...}`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

impl From<ListError> for ApiError {
    fn from(err: ListError) -> Self {
        match err {
            ListError::NotFound => Self::new(StatusCode::NOT_FOUND, err.to_string()),
            ListError::InvalidToken => Self::new(StatusCode::UNAUTHORIZED, err.to_string()),
            ListError::Invalid(msg) => Self::bad_request(msg),
            ListError::Store(e) => {
                tracing::error!(error = %e, "storage failure");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return Self::new(StatusCode::PAYLOAD_TOO_LARGE, "Request body too large");
        }
        tracing::debug!(error = %rejection.body_text(), "rejected request body");
        Self::bad_request("Invalid request body")
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        tracing::debug!(error = %rejection.body_text(), "rejected query string");
        Self::bad_request("Invalid query parameters")
    }
}

type ApiResult<T> = Result<T, ApiError>;

/// Service calls touch storage synchronously; keep them off the async workers.
async fn blocking<T, F>(service: &Arc<ListService>, f: F) -> ApiResult<T>
where
    T: Send + 'static,
    F: FnOnce(&ListService) -> Result<T, ListError> + Send + 'static,
{
    let service = service.clone();
    tokio::task::spawn_blocking(move || f(&service))
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "service task failed");
            ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        })?
        .map_err(ApiError::from)
}

pub async fn health() -> &'static str {
    "OK"
}

pub async fn create_list(
    State(state): State<AppState>,
    body: Result<Json<CreateListRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<CreateListResponse>)> {
    let Json(req) = body?;
    let resp = blocking(&state.service, move |svc| svc.create(req)).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

pub async fn get_list(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<TodoList>> {
    let list = blocking(&state.service, move |svc| svc.get(&id)).await?;
    Ok(Json(list))
}

#[derive(Debug, Deserialize, Default)]
pub struct UpdateParams {
    pub token: Option<String>,
    pub client_id: Option<String>,
}

pub async fn update_list(
    State(state): State<AppState>,
    Path(id): Path<String>,
    params: Result<Query<UpdateParams>, QueryRejection>,
    body: Result<Json<UpdateListRequest>, JsonRejection>,
) -> ApiResult<Json<TodoList>> {
    let Query(params) = params?;
    let Some(token) = params.token.filter(|t| !t.is_empty() && !id.is_empty()) else {
        return Err(ApiError::bad_request("ID and edit token are required"));
    };
    let Json(req) = body?;

    let list_id = id.clone();
    let list = blocking(&state.service, move |svc| svc.update(&list_id, &token, req)).await?;

    let updated_by = params.client_id.unwrap_or_default();
    let delivered = state.hub.broadcast(&id, &updated_by, &list);
    tracing::debug!(%id, delivered, "broadcast list update");
    Ok(Json(list))
}

pub async fn duplicate_list(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<(StatusCode, Json<CreateListResponse>)> {
    let resp = blocking(&state.service, move |svc| svc.duplicate(&id)).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

pub async fn record_view(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<FingerprintBody>, JsonRejection>,
) -> ApiResult<Json<Engagement>> {
    let Json(FingerprintBody { fingerprint }) = body?;
    let e = blocking(&state.service, move |svc| svc.record_view(&id, &fingerprint)).await?;
    Ok(Json(e))
}

pub async fn like_list(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<FingerprintBody>, JsonRejection>,
) -> ApiResult<Json<Engagement>> {
    let Json(FingerprintBody { fingerprint }) = body?;
    let e = blocking(&state.service, move |svc| svc.like(&id, &fingerprint)).await?;
    Ok(Json(e))
}

pub async fn unlike_list(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<FingerprintBody>, JsonRejection>,
) -> ApiResult<Json<Engagement>> {
    let Json(FingerprintBody { fingerprint }) = body?;
    let e = blocking(&state.service, move |svc| svc.unlike(&id, &fingerprint)).await?;
    Ok(Json(e))
}

#[derive(Debug, Deserialize, Default)]
pub struct TrendingParams {
    pub limit: Option<usize>,
}

pub async fn trending_tags(
    State(state): State<AppState>,
    params: Result<Query<TrendingParams>, QueryRejection>,
) -> ApiResult<Json<Vec<TrendingTag>>> {
    let Query(params) = params?;
    let tags = blocking(&state.service, move |svc| svc.trending_tags(params.limit)).await?;
    Ok(Json(tags))
}

/// Query string form of `SearchQuery`; `tags` is a comma separated list.
#[derive(Debug, Deserialize, Default)]
pub struct SearchParams {
    pub search: Option<String>,
    pub tags: Option<String>,
    pub cursor: Option<String>,
    pub limit: Option<usize>,
}

impl From<SearchParams> for SearchQuery {
    fn from(p: SearchParams) -> Self {
        SearchQuery {
            search: p.search.filter(|s| !s.trim().is_empty()),
            tags: p.tags.as_deref().map(parse_tag_input).unwrap_or_default(),
            cursor: p.cursor.filter(|c| !c.is_empty()),
            limit: p.limit,
        }
    }
}

pub async fn search_lists(
    State(state): State<AppState>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> ApiResult<Json<SearchPage>> {
    let Query(params) = params?;
    let query = SearchQuery::from(params);
    let page = blocking(&state.service, move |svc| svc.search(&query)).await?;
    Ok(Json(page))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;

    #[test]
    fn list_errors_map_to_statuses() {
        let cases = [
            (ListError::NotFound, StatusCode::NOT_FOUND),
            (ListError::InvalidToken, StatusCode::UNAUTHORIZED),
            (ListError::Invalid("x".into()), StatusCode::BAD_REQUEST),
            (
                ListError::Store(StoreError::Poisoned),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status, status);
        }
    }

    #[test]
    fn search_params_split_tags() {
        let q = SearchQuery::from(SearchParams {
            search: Some("  ".into()),
            tags: Some("Work, home  #errands".into()),
            cursor: Some(String::new()),
            limit: Some(5),
        });
        assert_eq!(q.search, None);
        assert_eq!(q.tags, vec!["work", "home", "errands"]);
        assert_eq!(q.cursor, None);
        assert_eq!(q.limit, Some(5));
    }
}
