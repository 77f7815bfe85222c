use chrono::NaiveDate;
use serde::Serialize;

use crate::model::task::{TaskId, TaskItem, TaskStatus};
use crate::sync::{FailureNotice, ListState, MutationKind, PendingMutation, Resolution};
use crate::util::unicode::fit_to_width;

/// Cells given to item content in text listings
pub const CONTENT_WIDTH: usize = 32;

// ---------------------------------------------------------------------------
// JSON output structs
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct ItemJson {
    pub id: TaskId,
    pub content: String,
    pub status: TaskStatus,
    pub bookmark: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub d_day: Option<String>,
}

#[derive(Serialize)]
pub struct ListJson {
    pub list: String,
    pub total_count: usize,
    pub has_more: bool,
    pub items: Vec<ItemJson>,
}

#[derive(Serialize)]
pub struct PendingJson {
    pub mutation: String,
    pub kind: MutationKind,
    pub target: TaskId,
}

#[derive(Serialize)]
pub struct ReplayJson {
    #[serde(flatten)]
    pub list: ListJson,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected: Option<TaskId>,
    pub in_flight: Vec<PendingJson>,
    pub failures: Vec<FailureNotice>,
    pub log: Vec<String>,
}

#[derive(Serialize)]
pub struct MutationJson {
    pub kind: MutationKind,
    pub target: TaskId,
    pub committed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ---------------------------------------------------------------------------
// Conversions
// ---------------------------------------------------------------------------

pub fn item_to_json(item: &TaskItem, today: NaiveDate) -> ItemJson {
    ItemJson {
        id: item.id,
        content: item.content.clone(),
        status: item.status,
        bookmark: item.bookmark,
        deadline: item
            .deadline
            .and_then(|d| d.to_date(today))
            .map(|d| d.format("%Y-%m-%d").to_string()),
        d_day: item.deadline.map(|d| d.d_day_label(today)),
    }
}

pub fn list_to_json(state: &ListState, today: NaiveDate) -> ListJson {
    ListJson {
        list: state.kind.name().to_string(),
        total_count: state.paging.total_count,
        has_more: state.paging.has_more(),
        items: state
            .items
            .items()
            .iter()
            .map(|item| item_to_json(item, today))
            .collect(),
    }
}

pub fn pending_to_json(pending: &PendingMutation) -> PendingJson {
    PendingJson {
        mutation: pending.id.to_string(),
        kind: pending.kind,
        target: pending.target,
    }
}

pub fn resolution_to_json(resolution: &Resolution) -> Option<MutationJson> {
    match resolution {
        Resolution::Committed { kind, target, .. } => Some(MutationJson {
            kind: *kind,
            target: *target,
            committed: true,
            error: None,
        }),
        Resolution::RolledBack(notice) => Some(MutationJson {
            kind: notice.kind,
            target: notice.target,
            committed: false,
            error: Some(notice.error.clone()),
        }),
        Resolution::Unknown(_) => None,
    }
}

// ---------------------------------------------------------------------------
// Text formatting
// ---------------------------------------------------------------------------

/// `[x] #12   content                           * D-3`
pub fn format_item_line(item: &TaskItem, today: NaiveDate) -> String {
    let id = if item.id.is_temporary() {
        "(new)".to_string()
    } else {
        format!("#{}", item.id)
    };
    let mut line = format!(
        "[{}] {:<5} {}",
        item.status.checkbox_char(),
        id,
        fit_to_width(&item.content, CONTENT_WIDTH)
    );
    if item.bookmark {
        line.push_str(" *");
    }
    if let Some(deadline) = item.deadline {
        line.push(' ');
        line.push_str(&deadline.d_day_label(today));
    }
    line.trim_end().to_string()
}

pub fn format_list_header(state: &ListState) -> String {
    let more = if state.paging.has_more() { ", more" } else { "" };
    format!(
        "{} ({} of {}{})",
        state.kind.name(),
        state.items.len(),
        state.paging.total_count.max(state.items.len()),
        more
    )
}

pub fn format_list(state: &ListState, today: NaiveDate) -> Vec<String> {
    let mut lines = vec![format_list_header(state)];
    if state.items.is_empty() {
        lines.push("  (empty)".to_string());
    }
    for item in state.items.items() {
        let marker = if state.selected == Some(item.id) { ">" } else { " " };
        lines.push(format!("{} {}", marker, format_item_line(item, today)));
    }
    lines
}

pub fn kind_label(kind: MutationKind) -> &'static str {
    match kind {
        MutationKind::Create => "create",
        MutationKind::Delete => "delete",
        MutationKind::UpdateStatus => "status",
        MutationKind::UpdateBookmark => "bookmark",
        MutationKind::UpdateDeadline => "deadline",
    }
}

pub fn format_failure(notice: &FailureNotice) -> String {
    format!(
        "! {} #{} rolled back ({}): {}",
        kind_label(notice.kind),
        notice.target,
        notice.error_kind,
        notice.error
    )
}

pub fn format_resolution(resolution: &Resolution) -> String {
    match resolution {
        Resolution::Committed { id, kind, target } => {
            format!("{} {} #{} committed", id, kind_label(*kind), target)
        }
        Resolution::RolledBack(notice) => format!("{} {}", notice.mutation, format_failure(notice)),
        Resolution::Unknown(id) => format!("{} ignored (already resolved)", id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiError;
    use crate::model::page::{ListKind, Page};
    use crate::model::task::Deadline;
    use crate::sync::{ListEvent, MutationId};
    use insta::assert_snapshot;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 18).unwrap()
    }

    fn sample_state() -> ListState {
        let mut a = TaskItem::new(TaskId(1), "장보기");
        a.bookmark = true;
        a.deadline = Some(Deadline::Days(3));
        let mut b = TaskItem::new(TaskId(12), "write the quarterly report for the board meeting");
        b.status = TaskStatus::Completed;
        let mut c = TaskItem::new(TaskId(-1), "call mom");
        c.deadline = Some(Deadline::Date(NaiveDate::from_ymd_opt(2026, 10, 16).unwrap()));
        ListState::new(ListKind::Backlog, 8)
            .apply(ListEvent::PageLoaded {
                page: 0,
                data: Page::new(vec![a, b, c], 5, 1),
            })
            .apply(ListEvent::Selected(Some(TaskId(12))))
    }

    #[test]
    fn list_text() {
        let output = format_list(&sample_state(), today()).join("\n");
        assert_snapshot!(output, @r"
        backlog (3 of 5)
          [ ] #1    장보기                           * D-3
        > [x] #12   write the quarterly report for …
          [ ] (new) call mom                         D+2
        ");
    }

    #[test]
    fn failure_text() {
        let notice = FailureNotice::new(
            MutationId(4),
            MutationKind::Delete,
            TaskId(2),
            &ApiError::Network("offline".into()),
        );
        assert_eq!(
            format_failure(&notice),
            "! delete #2 rolled back (network): network error: offline"
        );
        assert_eq!(
            format_resolution(&Resolution::RolledBack(notice)),
            "m4 ! delete #2 rolled back (network): network error: offline"
        );
    }

    #[test]
    fn list_json_shape() {
        let json = serde_json::to_value(list_to_json(&sample_state(), today())).unwrap();
        assert_eq!(json["list"], "backlog");
        assert_eq!(json["total_count"], 5);
        assert_eq!(json["has_more"], false);
        assert_eq!(json["items"][0]["d_day"], "D-3");
        assert_eq!(json["items"][0]["deadline"], "2026-10-21");
        assert_eq!(json["items"][1]["status"], "COMPLETED");
        assert!(json["items"][1].get("deadline").is_none());
    }
}
