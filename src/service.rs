// File: ./src/service.rs
// Every list operation the backend offers. Handlers and the local CLI backend
// both go through here.
use crate::error::ListError;
use crate::model::{
    CreateListRequest, CreateListResponse, Engagement, ItemDraft, Priority, SearchPage,
    SearchQuery, TodoItem, TodoList, TrendingTag, UpdateListRequest, normalize_tags,
};
use crate::store::{ListStore, StoredList};
use crate::token;
use chrono::{DateTime, Duration, Utc};
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

pub const DEFAULT_TRENDING_LIMIT: usize = 10;
pub const DEFAULT_SEARCH_LIMIT: usize = 12;
pub const MAX_PAGE_LIMIT: usize = 50;

#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub default_expiration_hours: i64,
    pub max_expiration_hours: i64,
    pub max_items: usize,
    pub max_content_len: usize,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            default_expiration_hours: 24,
            max_expiration_hours: 720,
            max_items: 500,
            max_content_len: 2000,
        }
    }
}

type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

pub struct ListService {
    store: Arc<dyn ListStore>,
    settings: ServiceSettings,
    clock: Clock,
    // Serializes read-modify-write cycles inside this process.
    write_lock: Mutex<()>,
}

impl ListService {
    pub fn new(store: Arc<dyn ListStore>, settings: ServiceSettings) -> Self {
        Self {
            store,
            settings,
            clock: Arc::new(Utc::now),
            write_lock: Mutex::new(()),
        }
    }

    pub fn with_clock<F>(mut self, clock: F) -> Self
    where
        F: Fn() -> DateTime<Utc> + Send + Sync + 'static,
    {
        self.clock = Arc::new(clock);
        self
    }

    pub fn settings(&self) -> &ServiceSettings {
        &self.settings
    }

    fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ()> {
        // A panic while holding the guard leaves no partial state behind.
        self.write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Live record or NotFound. Expired records behave as if already deleted.
    fn live(&self, id: &str) -> Result<StoredList, ListError> {
        match self.store.load(id)? {
            Some(record) if !record.list.is_expired_at(self.now()) => Ok(record),
            _ => Err(ListError::NotFound),
        }
    }

    fn validate_items(&self, items: &[ItemDraft]) -> Result<(), ListError> {
        if items.len() > self.settings.max_items {
            return Err(ListError::Invalid(format!(
                "A list holds at most {} items",
                self.settings.max_items
            )));
        }
        if items
            .iter()
            .any(|i| i.content.chars().count() > self.settings.max_content_len)
        {
            return Err(ListError::Invalid(format!(
                "Item content is limited to {} characters",
                self.settings.max_content_len
            )));
        }
        Ok(())
    }

    fn expiration_hours(&self, requested: i64) -> i64 {
        if requested <= 0 {
            self.settings.default_expiration_hours
        } else {
            requested.min(self.settings.max_expiration_hours)
        }
    }

    pub fn create(&self, req: CreateListRequest) -> Result<CreateListResponse, ListError> {
        self.validate_items(&req.items)?;
        let now = self.now();
        let hours = self.expiration_hours(req.expiration_hours);
        let expires_at = Duration::try_hours(hours)
            .and_then(|d| now.checked_add_signed(d))
            .ok_or_else(|| {
                ListError::Invalid(format!("Expiration of {} hours is out of range", hours))
            })?;
        let edit_token = token::generate();

        let items = req
            .items
            .into_iter()
            .enumerate()
            .map(|(index, draft)| TodoItem {
                id: Uuid::new_v4().to_string(),
                content: draft.content,
                completed: draft.completed,
                order: index as u32,
                priority: draft.priority.unwrap_or_default(),
                created_at: now,
                completed_at: draft.completed.then_some(now),
            })
            .collect();

        let record = StoredList {
            list: TodoList {
                id: Uuid::new_v4().to_string(),
                title: req.title.trim().to_string(),
                items,
                tags: normalize_tags(&req.tags),
                created_at: now,
                expires_at,
                view_count: 0,
                like_count: 0,
            },
            edit_token_hash: token::hash(&edit_token),
            viewers: BTreeSet::new(),
            likers: BTreeSet::new(),
        };

        let _guard = self.lock();
        self.store.save(&record)?;
        tracing::info!(id = %record.id(), items = record.list.items.len(), hours, "created list");

        Ok(CreateListResponse {
            id: record.list.id.clone(),
            edit_token,
            todo_list: record.snapshot(),
        })
    }

    pub fn get(&self, id: &str) -> Result<TodoList, ListError> {
        Ok(self.live(id)?.snapshot())
    }

    pub fn update(
        &self,
        id: &str,
        edit_token: &str,
        req: UpdateListRequest,
    ) -> Result<TodoList, ListError> {
        if edit_token.is_empty() {
            return Err(ListError::InvalidToken);
        }
        self.validate_items(&req.items)?;

        let _guard = self.lock();
        let mut record = self.live(id)?;
        if !token::verify(edit_token, &record.edit_token_hash) {
            tracing::warn!(%id, "rejected update with invalid edit token");
            return Err(ListError::InvalidToken);
        }

        let now = self.now();
        let mut previous: HashMap<String, TodoItem> = record
            .list
            .items
            .drain(..)
            .map(|item| (item.id.clone(), item))
            .collect();

        record.list.items = req
            .items
            .into_iter()
            .enumerate()
            .map(|(index, draft)| merge_item(draft, index, &mut previous, now))
            .collect();

        if let Some(tags) = req.tags {
            record.list.tags = normalize_tags(&tags);
        }
        if let Some(title) = req.title {
            record.list.title = title.trim().to_string();
        }

        self.store.save(&record)?;
        tracing::debug!(%id, items = record.list.items.len(), "updated list");
        Ok(record.snapshot())
    }

    pub fn duplicate(&self, id: &str) -> Result<CreateListResponse, ListError> {
        let source = self.get(id)?;
        let req = CreateListRequest {
            expiration_hours: self.settings.default_expiration_hours,
            items: source
                .items
                .iter()
                .map(|item| ItemDraft {
                    id: None,
                    content: item.content.clone(),
                    completed: false,
                    priority: Some(item.priority),
                })
                .collect(),
            tags: source.tags.clone(),
            title: source.title.clone(),
        };
        self.create(req)
    }

    pub fn record_view(&self, id: &str, fingerprint: &str) -> Result<Engagement, ListError> {
        self.engage(id, fingerprint, |record, fp| {
            record.viewers.insert(fp.to_string())
        })
    }

    pub fn like(&self, id: &str, fingerprint: &str) -> Result<Engagement, ListError> {
        self.engage(id, fingerprint, |record, fp| record.likers.insert(fp.to_string()))
    }

    pub fn unlike(&self, id: &str, fingerprint: &str) -> Result<Engagement, ListError> {
        self.engage(id, fingerprint, |record, fp| record.likers.remove(fp))
    }

    fn engage<F>(&self, id: &str, fingerprint: &str, apply: F) -> Result<Engagement, ListError>
    where
        F: FnOnce(&mut StoredList, &str) -> bool,
    {
        let fingerprint = fingerprint.trim();
        if fingerprint.is_empty() {
            return Err(ListError::Invalid("Fingerprint is required".to_string()));
        }
        let _guard = self.lock();
        let mut record = self.live(id)?;
        let counted = apply(&mut record, fingerprint);
        if counted {
            self.store.save(&record)?;
        }
        Ok(Engagement {
            view_count: record.viewers.len() as u64,
            like_count: record.likers.len() as u64,
            counted,
        })
    }

    fn live_lists(&self) -> Result<Vec<StoredList>, ListError> {
        let now = self.now();
        Ok(self
            .store
            .all()?
            .into_iter()
            .filter(|r| !r.list.is_expired_at(now))
            .collect())
    }

    pub fn trending_tags(&self, limit: Option<usize>) -> Result<Vec<TrendingTag>, ListError> {
        let limit = clamp_limit(limit, DEFAULT_TRENDING_LIMIT);
        let mut counts: HashMap<String, u64> = HashMap::new();
        for record in self.live_lists()? {
            for tag in &record.list.tags {
                *counts.entry(tag.clone()).or_default() += 1;
            }
        }
        let mut tags: Vec<TrendingTag> = counts
            .into_iter()
            .map(|(name, usage_count)| TrendingTag { name, usage_count })
            .collect();
        tags.sort_by(|a, b| b.usage_count.cmp(&a.usage_count).then(a.name.cmp(&b.name)));
        tags.truncate(limit);
        Ok(tags)
    }

    pub fn search(&self, query: &SearchQuery) -> Result<SearchPage, ListError> {
        let limit = clamp_limit(query.limit, DEFAULT_SEARCH_LIMIT);
        let needle = query
            .search
            .as_deref()
            .map(|s| s.trim().to_lowercase())
            .unwrap_or_default();
        let wanted = normalize_tags(&query.tags);
        let cursor = match query.cursor.as_deref() {
            Some(c) if !c.is_empty() => Some(
                parse_cursor(c).ok_or_else(|| ListError::Invalid("Invalid cursor".to_string()))?,
            ),
            _ => None,
        };

        let mut matches: Vec<TodoList> = self
            .live_lists()?
            .into_iter()
            .filter(|r| wanted.iter().all(|t| r.list.tags.contains(t)))
            .filter(|r| needle.is_empty() || matches_text(&r.list, &needle))
            .map(|r| r.snapshot())
            .collect();

        // Newest first, id breaks ties so the cursor is a total order.
        matches.sort_by(|a, b| {
            b.created_at
                .timestamp_micros()
                .cmp(&a.created_at.timestamp_micros())
                .then(b.id.cmp(&a.id))
        });

        if let Some((micros, ref id)) = cursor {
            matches.retain(|l| {
                let key = l.created_at.timestamp_micros();
                key < micros || (key == micros && l.id.as_str() < id.as_str())
            });
        }

        let has_more = matches.len() > limit;
        matches.truncate(limit);
        let next_cursor = if has_more {
            matches.last().map(cursor_for)
        } else {
            None
        };
        Ok(SearchPage {
            lists: matches,
            next_cursor,
        })
    }

    pub fn purge_expired(&self) -> Result<usize, ListError> {
        let now = self.now();
        let _guard = self.lock();
        let mut removed = 0;
        for record in self.store.all()? {
            if record.list.is_expired_at(now) && self.store.remove(record.id())? {
                removed += 1;
            }
        }
        Ok(removed)
    }
}

fn merge_item(
    draft: ItemDraft,
    index: usize,
    previous: &mut HashMap<String, TodoItem>,
    now: DateTime<Utc>,
) -> TodoItem {
    // Each stored item is claimed once; a repeated id becomes a new item.
    let existing = draft.id.as_deref().and_then(|id| previous.remove(id));
    match existing {
        Some(old) => TodoItem {
            id: old.id,
            content: draft.content,
            completed: draft.completed,
            order: index as u32,
            priority: draft.priority.unwrap_or(old.priority),
            created_at: old.created_at,
            completed_at: match (draft.completed, old.completed) {
                (false, _) => None,
                (true, true) => old.completed_at.or(Some(now)),
                (true, false) => Some(now),
            },
        },
        None => TodoItem {
            id: Uuid::new_v4().to_string(),
            content: draft.content,
            completed: draft.completed,
            order: index as u32,
            priority: draft.priority.unwrap_or(Priority::Medium),
            created_at: now,
            completed_at: draft.completed.then_some(now),
        },
    }
}

fn matches_text(list: &TodoList, needle: &str) -> bool {
    list.title.to_lowercase().contains(needle)
        || list.tags.iter().any(|t| t.contains(needle))
        || list
            .items
            .iter()
            .any(|i| i.content.to_lowercase().contains(needle))
}

fn clamp_limit(limit: Option<usize>, default: usize) -> usize {
    limit.unwrap_or(default).clamp(1, MAX_PAGE_LIMIT)
}

fn cursor_for(list: &TodoList) -> String {
    format!("{}_{}", list.created_at.timestamp_micros(), list.id)
}

fn parse_cursor(cursor: &str) -> Option<(i64, String)> {
    let (micros, id) = cursor.split_once('_')?;
    Some((micros.parse().ok()?, id.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use std::sync::atomic::{AtomicI64, Ordering};

    fn service() -> ListService {
        ListService::new(Arc::new(MemoryStore::new()), ServiceSettings::default())
    }

    /// Service whose clock can be moved forward by the test.
    fn service_with_clock() -> (ListService, Arc<AtomicI64>) {
        let offset = Arc::new(AtomicI64::new(0));
        let base = Utc::now();
        let o = offset.clone();
        let svc = service().with_clock(move || base + Duration::seconds(o.load(Ordering::SeqCst)));
        (svc, offset)
    }

    fn create(svc: &ListService, items: &[&str]) -> CreateListResponse {
        svc.create(CreateListRequest {
            expiration_hours: 0,
            items: items.iter().map(|c| ItemDraft::new(c)).collect(),
            tags: vec![],
            title: String::new(),
        })
        .unwrap()
    }

    #[test]
    fn create_assigns_ids_order_and_default_expiry() {
        let svc = service();
        let resp = create(&svc, &["a", "b"]);
        let list = &resp.todo_list;
        assert_eq!(list.items.len(), 2);
        assert_eq!(list.items[1].order, 1);
        assert_ne!(list.items[0].id, list.items[1].id);
        assert_eq!(list.items[0].priority, Priority::Medium);
        assert_eq!((list.expires_at - list.created_at).num_hours(), 24);
        assert_ne!(resp.edit_token, "");
    }

    #[test]
    fn expiration_is_clamped() {
        let svc = service();
        let resp = svc
            .create(CreateListRequest {
                expiration_hours: 100_000,
                ..Default::default()
            })
            .unwrap();
        let list = resp.todo_list;
        assert_eq!((list.expires_at - list.created_at).num_hours(), 720);
    }

    #[test]
    fn update_requires_the_edit_token() {
        let svc = service();
        let resp = create(&svc, &["a"]);
        let err = svc
            .update(&resp.id, "wrong", UpdateListRequest::default())
            .unwrap_err();
        assert!(matches!(err, ListError::InvalidToken));
        let err = svc
            .update("missing", &resp.edit_token, UpdateListRequest::default())
            .unwrap_err();
        assert!(matches!(err, ListError::NotFound));
    }

    #[test]
    fn update_preserves_known_items_and_assigns_new_ones() {
        let (svc, clock) = service_with_clock();
        let resp = create(&svc, &["keep", "drop"]);
        let keep = resp.todo_list.items[0].clone();
        clock.store(60, Ordering::SeqCst);

        let mut done = keep.to_draft();
        done.completed = true;
        done.content = "keep (edited)".to_string();
        let fresh = ItemDraft {
            id: Some("temp-123".to_string()),
            content: "new".to_string(),
            completed: false,
            priority: Some(Priority::High),
        };
        let updated = svc
            .update(
                &resp.id,
                &resp.edit_token,
                UpdateListRequest {
                    items: vec![fresh, done],
                    tags: Some(vec!["Work".to_string()]),
                    title: Some(" Chores ".to_string()),
                },
            )
            .unwrap();

        assert_eq!(updated.items.len(), 2);
        let new_item = &updated.items[0];
        assert_ne!(new_item.id, "temp-123");
        assert_eq!(new_item.order, 0);
        assert_eq!(new_item.priority, Priority::High);
        assert!(new_item.created_at > keep.created_at);

        let kept = &updated.items[1];
        assert_eq!(kept.id, keep.id);
        assert_eq!(kept.order, 1);
        assert_eq!(kept.created_at, keep.created_at);
        assert_eq!(kept.content, "keep (edited)");
        let stamped = kept.completed_at.expect("completed_at stamped");

        assert_eq!(updated.tags, vec!["work"]);
        assert_eq!(updated.title, "Chores");
        assert_eq!(updated.expires_at, resp.todo_list.expires_at);

        // Completing again keeps the original stamp; un-completing clears it.
        clock.store(120, Ordering::SeqCst);
        let again = svc
            .update(&resp.id, &resp.edit_token, UpdateListRequest::from_list(&updated))
            .unwrap();
        assert_eq!(again.items[1].completed_at, Some(stamped));

        let mut reopened = again.clone();
        reopened.items[1].completed = false;
        let reopened = svc
            .update(&resp.id, &resp.edit_token, UpdateListRequest::from_list(&reopened))
            .unwrap();
        assert_eq!(reopened.items[1].completed_at, None);
        assert_eq!(reopened.tags, vec!["work"], "tags untouched when omitted");
    }

    #[test]
    fn repeated_item_ids_are_split_into_new_items() {
        let (svc, clock) = service_with_clock();
        let resp = create(&svc, &["a"]);
        let original = resp.todo_list.items[0].clone();
        clock.store(60, Ordering::SeqCst);

        let draft = original.to_draft();
        let updated = svc
            .update(
                &resp.id,
                &resp.edit_token,
                UpdateListRequest {
                    items: vec![draft.clone(), draft],
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(updated.items.len(), 2);
        assert_eq!(updated.items[0].id, original.id);
        assert_eq!(updated.items[0].created_at, original.created_at);
        assert_ne!(updated.items[1].id, original.id);
        assert!(updated.items[1].created_at > original.created_at);
        assert_eq!(updated.items[1].content, "a");
    }

    #[test]
    fn out_of_range_expiration_is_rejected() {
        let svc = ListService::new(
            Arc::new(MemoryStore::new()),
            ServiceSettings {
                max_expiration_hours: i64::MAX,
                ..ServiceSettings::default()
            },
        );
        let err = svc
            .create(CreateListRequest {
                expiration_hours: i64::MAX,
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, ListError::Invalid(_)));
    }

    #[test]
    fn expired_lists_are_invisible_and_purged() {
        let (svc, clock) = service_with_clock();
        let resp = create(&svc, &["a"]);
        assert!(svc.get(&resp.id).is_ok());

        clock.store(25 * 3600, Ordering::SeqCst);
        assert!(matches!(svc.get(&resp.id), Err(ListError::NotFound)));
        assert_eq!(svc.purge_expired().unwrap(), 1);
        assert_eq!(svc.purge_expired().unwrap(), 0);
    }

    #[test]
    fn duplicate_resets_completion_and_keeps_shape() {
        let svc = service();
        let resp = svc
            .create(CreateListRequest {
                expiration_hours: 48,
                items: vec![
                    ItemDraft {
                        completed: true,
                        priority: Some(Priority::High),
                        ..ItemDraft::new("a")
                    },
                    ItemDraft::new("b"),
                ],
                tags: vec!["home".to_string()],
                title: "Weekend".to_string(),
            })
            .unwrap();
        let copy = svc.duplicate(&resp.id).unwrap();
        assert_ne!(copy.id, resp.id);
        assert_ne!(copy.edit_token, resp.edit_token);
        let list = copy.todo_list;
        assert!(list.items.iter().all(|i| !i.completed && i.completed_at.is_none()));
        assert_eq!(list.items[0].priority, Priority::High);
        assert_eq!(list.items[1].content, "b");
        assert_eq!(list.tags, vec!["home"]);
        assert_eq!(list.title, "Weekend");
        assert_eq!((list.expires_at - list.created_at).num_hours(), 24);
    }

    #[test]
    fn views_and_likes_dedupe_per_fingerprint() {
        let svc = service();
        let resp = create(&svc, &["a"]);
        assert!(svc.record_view(&resp.id, "fp-1").unwrap().counted);
        assert!(!svc.record_view(&resp.id, "fp-1").unwrap().counted);
        let e = svc.record_view(&resp.id, "fp-2").unwrap();
        assert_eq!(e.view_count, 2);

        assert_eq!(svc.like(&resp.id, "fp-1").unwrap().like_count, 1);
        assert!(!svc.like(&resp.id, "fp-1").unwrap().counted);
        assert_eq!(svc.unlike(&resp.id, "fp-1").unwrap().like_count, 0);
        assert!(!svc.unlike(&resp.id, "fp-1").unwrap().counted);

        assert!(matches!(
            svc.like(&resp.id, "  "),
            Err(ListError::Invalid(_))
        ));
        let list = svc.get(&resp.id).unwrap();
        assert_eq!(list.view_count, 2);
        assert_eq!(list.like_count, 0);
    }

    #[test]
    fn trending_counts_live_lists() {
        let svc = service();
        for tags in [vec!["rust", "work"], vec!["rust"], vec!["home"]] {
            svc.create(CreateListRequest {
                tags: tags.into_iter().map(String::from).collect(),
                ..Default::default()
            })
            .unwrap();
        }
        let trending = svc.trending_tags(Some(2)).unwrap();
        assert_eq!(
            trending,
            vec![
                TrendingTag {
                    name: "rust".to_string(),
                    usage_count: 2
                },
                TrendingTag {
                    name: "home".to_string(),
                    usage_count: 1
                },
            ]
        );
    }

    #[test]
    fn search_filters_and_paginates() {
        let (svc, clock) = service_with_clock();
        for i in 0..5 {
            clock.store(i, Ordering::SeqCst);
            svc.create(CreateListRequest {
                items: vec![ItemDraft::new(&format!("task {}", i))],
                tags: if i % 2 == 0 { vec!["even".to_string()] } else { vec![] },
                title: format!("List {}", i),
                ..Default::default()
            })
            .unwrap();
        }

        let page = svc
            .search(&SearchQuery {
                limit: Some(2),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(page.lists.len(), 2);
        assert_eq!(page.lists[0].title, "List 4");
        let next = page.next_cursor.clone().expect("more pages");

        let page2 = svc
            .search(&SearchQuery {
                cursor: Some(next),
                limit: Some(10),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(
            page2.lists.iter().map(|l| l.title.as_str()).collect::<Vec<_>>(),
            vec!["List 2", "List 1", "List 0"]
        );
        assert!(page2.next_cursor.is_none());

        let even = svc
            .search(&SearchQuery {
                tags: vec!["EVEN".to_string()],
                search: Some("TASK 2".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(even.lists.len(), 1);
        assert_eq!(even.lists[0].title, "List 2");

        assert!(matches!(
            svc.search(&SearchQuery {
                cursor: Some("garbage".to_string()),
                ..Default::default()
            }),
            Err(ListError::Invalid(_))
        ));
    }

    #[test]
    fn oversized_requests_are_rejected() {
        let svc = ListService::new(
            Arc::new(MemoryStore::new()),
            ServiceSettings {
                max_items: 1,
                max_content_len: 3,
                ..ServiceSettings::default()
            },
        );
        let too_many = CreateListRequest {
            items: vec![ItemDraft::new("a"), ItemDraft::new("b")],
            ..Default::default()
        };
        assert!(matches!(svc.create(too_many), Err(ListError::Invalid(_))));
        let too_long = CreateListRequest {
            items: vec![ItemDraft::new("abcd")],
            ..Default::default()
        };
        assert!(matches!(svc.create(too_long), Err(ListError::Invalid(_))));
    }
}
