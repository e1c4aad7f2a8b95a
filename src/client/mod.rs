// File: ./src/client/mod.rs
// Talking to a todobin backend: over HTTP, or straight to a local ListService.
pub mod cert;
pub mod core;
pub mod links;
pub mod watch;

pub use self::core::{ClientError, TodoClient, ws_url};
pub use self::links::ShareLinks;
pub use self::watch::{SyncMode, WatchEvent, WatchHandle, watch, watch_polling};

use crate::model::{
    CreateListRequest, CreateListResponse, Engagement, SearchPage, SearchQuery, TodoList,
    TrendingTag, UpdateListRequest,
};
use crate::service::ListService;
use std::future::Future;

/// Everything a front end needs from a backend.
pub trait TodoApi: Send + Sync {
    fn create(
        &self,
        req: CreateListRequest,
    ) -> impl Future<Output = anyhow::Result<CreateListResponse>> + Send;

    fn get(&self, id: &str) -> impl Future<Output = anyhow::Result<TodoList>> + Send;

    /// `client_id` identifies the writer so its own WebSocket is not echoed.
    fn update(
        &self,
        id: &str,
        edit_token: &str,
        client_id: Option<&str>,
        req: UpdateListRequest,
    ) -> impl Future<Output = anyhow::Result<TodoList>> + Send;

    fn duplicate(&self, id: &str)
    -> impl Future<Output = anyhow::Result<CreateListResponse>> + Send;

    fn search(&self, query: &SearchQuery)
    -> impl Future<Output = anyhow::Result<SearchPage>> + Send;

    fn trending(
        &self,
        limit: Option<usize>,
    ) -> impl Future<Output = anyhow::Result<Vec<TrendingTag>>> + Send;

    fn record_view(
        &self,
        id: &str,
        fingerprint: &str,
    ) -> impl Future<Output = anyhow::Result<Engagement>> + Send;

    fn like(
        &self,
        id: &str,
        fingerprint: &str,
    ) -> impl Future<Output = anyhow::Result<Engagement>> + Send;

    fn unlike(
        &self,
        id: &str,
        fingerprint: &str,
    ) -> impl Future<Output = anyhow::Result<Engagement>> + Send;
}

impl TodoApi for TodoClient {
    async fn create(&self, req: CreateListRequest) -> anyhow::Result<CreateListResponse> {
        Ok(TodoClient::create(self, &req).await?)
    }

    async fn get(&self, id: &str) -> anyhow::Result<TodoList> {
        Ok(TodoClient::get(self, id).await?)
    }

    async fn update(
        &self,
        id: &str,
        edit_token: &str,
        client_id: Option<&str>,
        req: UpdateListRequest,
    ) -> anyhow::Result<TodoList> {
        Ok(TodoClient::update(self, id, edit_token, client_id, &req).await?)
    }

    async fn duplicate(&self, id: &str) -> anyhow::Result<CreateListResponse> {
        Ok(TodoClient::duplicate(self, id).await?)
    }

    async fn search(&self, query: &SearchQuery) -> anyhow::Result<SearchPage> {
        Ok(TodoClient::search(self, query).await?)
    }

    async fn trending(&self, limit: Option<usize>) -> anyhow::Result<Vec<TrendingTag>> {
        Ok(TodoClient::trending(self, limit).await?)
    }

    async fn record_view(&self, id: &str, fingerprint: &str) -> anyhow::Result<Engagement> {
        Ok(TodoClient::record_view(self, id, fingerprint).await?)
    }

    async fn like(&self, id: &str, fingerprint: &str) -> anyhow::Result<Engagement> {
        Ok(TodoClient::like(self, id, fingerprint).await?)
    }

    async fn unlike(&self, id: &str, fingerprint: &str) -> anyhow::Result<Engagement> {
        Ok(TodoClient::unlike(self, id, fingerprint).await?)
    }
}

// Direct access; there is no hub to notify, so `client_id` is unused.
impl TodoApi for ListService {
    async fn create(&self, req: CreateListRequest) -> anyhow::Result<CreateListResponse> {
        Ok(ListService::create(self, req)?)
    }

    async fn get(&self, id: &str) -> anyhow::Result<TodoList> {
        Ok(ListService::get(self, id)?)
    }

    async fn update(
        &self,
        id: &str,
        edit_token: &str,
        _client_id: Option<&str>,
        req: UpdateListRequest,
    ) -> anyhow::Result<TodoList> {
        Ok(ListService::update(self, id, edit_token, req)?)
    }

    async fn duplicate(&self, id: &str) -> anyhow::Result<CreateListResponse> {
        Ok(ListService::duplicate(self, id)?)
    }

    async fn search(&self, query: &SearchQuery) -> anyhow::Result<SearchPage> {
        Ok(ListService::search(self, query)?)
    }

    async fn trending(&self, limit: Option<usize>) -> anyhow::Result<Vec<TrendingTag>> {
        Ok(self.trending_tags(limit)?)
    }

    async fn record_view(&self, id: &str, fingerprint: &str) -> anyhow::Result<Engagement> {
        Ok(ListService::record_view(self, id, fingerprint)?)
    }

    async fn like(&self, id: &str, fingerprint: &str) -> anyhow::Result<Engagement> {
        Ok(ListService::like(self, id, fingerprint)?)
    }

    async fn unlike(&self, id: &str, fingerprint: &str) -> anyhow::Result<Engagement> {
        Ok(ListService::unlike(self, id, fingerprint)?)
    }
}
