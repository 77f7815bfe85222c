use serde::Serialize;

use crate::model::task::{Deadline, TaskItem, TaskStatus};

/// The value of one editable field of a task, captured so it can be written
/// back later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "field", content = "value", rename_all = "lowercase")]
pub enum TaskField {
    Status(TaskStatus),
    Bookmark(bool),
    Deadline(Option<Deadline>),
}

impl TaskField {
    /// Read the same field from another item
    pub fn read_from(&self, item: &TaskItem) -> TaskField {
        match self {
            TaskField::Status(_) => TaskField::Status(item.status),
            TaskField::Bookmark(_) => TaskField::Bookmark(item.bookmark),
            TaskField::Deadline(_) => TaskField::Deadline(item.deadline),
        }
    }

    pub fn write_to(&self, item: &mut TaskItem) {
        match *self {
            TaskField::Status(status) => set_status(item, status),
            TaskField::Bookmark(bookmark) => item.bookmark = bookmark,
            TaskField::Deadline(deadline) => set_deadline(item, deadline),
        }
    }

    /// True if `item` currently holds exactly this value
    pub fn is_held_by(&self, item: &TaskItem) -> bool {
        self.read_from(item) == *self
    }
}

pub fn set_status(item: &mut TaskItem, status: TaskStatus) {
    item.status = status;
}

/// Flip completion: incomplete → completed → incomplete
pub fn toggle_status(item: &mut TaskItem) {
    set_status(item, item.status.toggled());
}

pub fn toggle_bookmark(item: &mut TaskItem) {
    item.bookmark = !item.bookmark;
}

pub fn set_deadline(item: &mut TaskItem, deadline: Option<Deadline>) {
    item.deadline = deadline;
}

/// Validate new task content, returning it trimmed
pub fn validate_content(content: &str) -> Result<String, String> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err("task content cannot be empty".to_string());
    }
    Ok(trimmed.to_string())
}
