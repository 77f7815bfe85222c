use std::collections::HashSet;

use serde::Serialize;

use crate::model::task::{TaskId, TaskItem};

/// Error type for list operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ListError {
    #[error("task not found: {0}")]
    NotFound(TaskId),
    #[error("duplicate task id: {0}")]
    DuplicateId(TaskId),
    #[error("index out of range: {index} (list has {len} items)")]
    IndexOutOfRange { index: usize, len: usize },
}

/// Display-ordered task list. Ids are unique at every observable point.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct OrderedList {
    items: Vec<TaskItem>,
}

impl OrderedList {
    pub fn new() -> Self {
        OrderedList::default()
    }

    /// Build from items, dropping later duplicates of an id.
    pub fn from_items(items: Vec<TaskItem>) -> Self {
        let mut list = OrderedList::new();
        list.replace_all(items);
        list
    }

    pub fn items(&self) -> &[TaskItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn ids(&self) -> Vec<TaskId> {
        self.items.iter().map(|t| t.id).collect()
    }

    pub fn get(&self, id: TaskId) -> Option<&TaskItem> {
        self.items.iter().find(|t| t.id == id)
    }

    pub fn position(&self, id: TaskId) -> Option<usize> {
        self.items.iter().position(|t| t.id == id)
    }

    pub fn contains(&self, id: TaskId) -> bool {
        self.position(id).is_some()
    }

    /// Insert an item for immediate display. `at_index` past the end appends.
    pub fn insert_local(&mut self, item: TaskItem, at_index: usize) -> Result<usize, ListError> {
        if self.contains(item.id) {
            return Err(ListError::DuplicateId(item.id));
        }
        let index = at_index.min(self.items.len());
        self.items.insert(index, item);
        Ok(index)
    }

    /// Move the element at `from` to `to`, shifting the ones in between by
    /// one slot. Both indices must be in bounds; otherwise nothing changes.
    pub fn reorder(&mut self, from: usize, to: usize) -> Result<(), ListError> {
        let len = self.items.len();
        for index in [from, to] {
            if index >= len {
                return Err(ListError::IndexOutOfRange { index, len });
            }
        }
        if from == to {
            return Ok(());
        }
        let item = self.items.remove(from);
        self.items.insert(to, item);
        Ok(())
    }

    /// Remove by id, returning the removed item and the index it occupied.
    pub fn remove(&mut self, id: TaskId) -> Result<(TaskItem, usize), ListError> {
        let index = self.position(id).ok_or(ListError::NotFound(id))?;
        Ok((self.items.remove(index), index))
    }

    /// Authoritative replacement after a fetch. First occurrence of an id wins.
    pub fn replace_all(&mut self, items: Vec<TaskItem>) {
        let mut seen = HashSet::new();
        self.items = items.into_iter().filter(|t| seen.insert(t.id)).collect();
    }

    /// Append a later page, skipping ids already shown. Returns how many
    /// items were added.
    pub fn append_page(&mut self, items: Vec<TaskItem>) -> usize {
        let mut seen: HashSet<TaskId> = self.items.iter().map(|t| t.id).collect();
        let before = self.items.len();
        self.items
            .extend(items.into_iter().filter(|t| seen.insert(t.id)));
        self.items.len() - before
    }

    /// Edit an item in place
    pub fn update<F>(&mut self, id: TaskId, f: F) -> Result<(), ListError>
    where
        F: FnOnce(&mut TaskItem),
    {
        let item = self
            .items
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(ListError::NotFound(id))?;
        f(item);
        Ok(())
    }

    /// Replace a temporary id with the server-assigned one. If the assigned id
    /// is already present (a refetch got there first) the temporary entry is
    /// dropped instead.
    pub fn rekey(&mut self, from: TaskId, to: TaskId) -> Result<(), ListError> {
        let index = self.position(from).ok_or(ListError::NotFound(from))?;
        if from != to && self.contains(to) {
            self.items.remove(index);
            return Ok(());
        }
        self.items[index].id = to;
        Ok(())
    }
}

impl From<Vec<TaskItem>> for OrderedList {
    fn from(items: Vec<TaskItem>) -> Self {
        OrderedList::from_items(items)
    }
}
