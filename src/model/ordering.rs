// File: ./src/model/ordering.rs
// Local list editing: reorder, add, remove, toggle, and the filtered views.
use crate::model::item::{Priority, TEMP_ID_PREFIX, TodoItem};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Rewrites `order` so it matches the vector position.
pub fn renumber(items: &mut [TodoItem]) {
    for (index, item) in items.iter_mut().enumerate() {
        item.order = index as u32;
    }
}

/// Moves the item at `from` to `to`. `to` past the end means "last".
/// Returns false (and leaves the list alone) when `from` is out of range.
pub fn move_item(items: &mut Vec<TodoItem>, from: usize, to: usize) -> bool {
    if from >= items.len() {
        return false;
    }
    let item = items.remove(from);
    let to = to.min(items.len());
    items.insert(to, item);
    renumber(items);
    true
}

pub fn remove_item(items: &mut Vec<TodoItem>, id: &str) -> Option<TodoItem> {
    let idx = items.iter().position(|i| i.id == id)?;
    let removed = items.remove(idx);
    renumber(items);
    Some(removed)
}

/// Appends a locally created item. The server replaces the temporary id.
pub fn push_draft(
    items: &mut Vec<TodoItem>,
    content: &str,
    priority: Priority,
    now: DateTime<Utc>,
) -> usize {
    items.push(TodoItem {
        id: format!("{}{}", TEMP_ID_PREFIX, Uuid::new_v4()),
        content: content.to_string(),
        completed: false,
        order: items.len() as u32,
        priority,
        created_at: now,
        completed_at: None,
    });
    items.len() - 1
}

pub fn toggle_item(item: &mut TodoItem, now: DateTime<Utc>) {
    item.completed = !item.completed;
    item.completed_at = if item.completed { Some(now) } else { None };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TaskFilter {
    #[default]
    All,
    Completed,
    Incomplete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TaskSort {
    #[default]
    Order,
    Priority,
    Alphabetical,
    Created,
}

/// Filtered and sorted view over `items`; the underlying order is untouched.
pub fn view<'a>(
    items: &'a [TodoItem],
    filter: TaskFilter,
    text: &str,
    sort: TaskSort,
) -> Vec<&'a TodoItem> {
    let needle = text.trim().to_lowercase();
    let mut out: Vec<&TodoItem> = items
        .iter()
        .filter(|i| match filter {
            TaskFilter::All => true,
            TaskFilter::Completed => i.completed,
            TaskFilter::Incomplete => !i.completed,
        })
        .filter(|i| needle.is_empty() || i.content.to_lowercase().contains(&needle))
        .collect();

    match sort {
        TaskSort::Order => out.sort_by_key(|i| i.order),
        TaskSort::Priority => {
            out.sort_by(|a, b| b.priority.cmp(&a.priority).then(a.order.cmp(&b.order)))
        }
        TaskSort::Alphabetical => out.sort_by(|a, b| {
            a.content
                .to_lowercase()
                .cmp(&b.content.to_lowercase())
                .then(a.order.cmp(&b.order))
        }),
        TaskSort::Created => {
            out.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.order.cmp(&b.order)))
        }
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
}

impl Progress {
    pub fn of(items: &[TodoItem]) -> Self {
        Self {
            completed: items.iter().filter(|i| i.completed).count(),
            total: items.len(),
        }
    }

    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.completed as f64 / self.total as f64 * 100.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items(names: &[&str]) -> Vec<TodoItem> {
        let now = Utc::now();
        let mut v = Vec::new();
        for n in names {
            push_draft(&mut v, n, Priority::Medium, now);
        }
        v
    }

    fn contents(items: &[TodoItem]) -> Vec<&str> {
        items.iter().map(|i| i.content.as_str()).collect()
    }

    #[test]
    fn move_splices_and_renumbers() {
        let mut v = items(&["a", "b", "c", "d"]);
        assert!(move_item(&mut v, 0, 2));
        assert_eq!(contents(&v), vec!["b", "c", "a", "d"]);
        assert_eq!(v.iter().map(|i| i.order).collect::<Vec<_>>(), vec![0, 1, 2, 3]);

        assert!(move_item(&mut v, 3, 0));
        assert_eq!(contents(&v), vec!["d", "b", "c", "a"]);
    }

    #[test]
    fn move_out_of_range_is_noop_and_target_is_clamped() {
        let mut v = items(&["a", "b"]);
        assert!(!move_item(&mut v, 5, 0));
        assert_eq!(contents(&v), vec!["a", "b"]);
        assert!(move_item(&mut v, 0, 99));
        assert_eq!(contents(&v), vec!["b", "a"]);
    }

    #[test]
    fn remove_renumbers_remaining() {
        let mut v = items(&["a", "b", "c"]);
        let id = v[1].id.clone();
        let removed = remove_item(&mut v, &id).unwrap();
        assert_eq!(removed.content, "b");
        assert_eq!(v[1].content, "c");
        assert_eq!(v[1].order, 1);
        assert!(remove_item(&mut v, "missing").is_none());
    }

    #[test]
    fn pushed_items_are_temporary() {
        let v = items(&["a"]);
        assert!(v[0].is_temporary());
        assert_eq!(v[0].order, 0);
    }

    #[test]
    fn toggle_stamps_and_clears_completion() {
        let mut v = items(&["a"]);
        let now = Utc::now();
        toggle_item(&mut v[0], now);
        assert!(v[0].completed);
        assert_eq!(v[0].completed_at, Some(now));
        toggle_item(&mut v[0], now);
        assert!(!v[0].completed);
        assert_eq!(v[0].completed_at, None);
    }

    #[test]
    fn view_filters_and_sorts() {
        let mut v = items(&["walk dog", "Buy milk", "answer mail"]);
        v[0].priority = Priority::Low;
        v[2].priority = Priority::High;
        v[1].completed = true;

        let by_prio = view(&v, TaskFilter::All, "", TaskSort::Priority);
        assert_eq!(
            by_prio.iter().map(|i| i.content.as_str()).collect::<Vec<_>>(),
            vec!["answer mail", "Buy milk", "walk dog"]
        );

        let open = view(&v, TaskFilter::Incomplete, "", TaskSort::Alphabetical);
        assert_eq!(
            open.iter().map(|i| i.content.as_str()).collect::<Vec<_>>(),
            vec!["answer mail", "walk dog"]
        );

        let text = view(&v, TaskFilter::All, "MIL", TaskSort::Order);
        assert_eq!(text.len(), 1);
        assert_eq!(text[0].content, "Buy milk");
    }

    #[test]
    fn progress_counts_completed() {
        let mut v = items(&["a", "b", "c", "d"]);
        v[0].completed = true;
        let p = Progress::of(&v);
        assert_eq!(p.completed, 1);
        assert_eq!(p.total, 4);
        assert!((p.percent() - 25.0).abs() < f64::EPSILON);
        assert_eq!(Progress::of(&[]).percent(), 0.0);
    }
}
