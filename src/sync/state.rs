use std::collections::VecDeque;

use serde::Serialize;

use crate::api::ApiError;
use crate::gesture::MoveEvent;
use crate::model::page::{ListKind, Page};
use crate::model::task::{TaskId, TaskItem};
use crate::ops::list_ops::OrderedList;

use super::coordinator::{MutationId, MutationKind};

/// A mutation that was rolled back, for the presentation layer to show once
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureNotice {
    pub mutation: MutationId,
    pub kind: MutationKind,
    pub target: TaskId,
    pub error: String,
    pub error_kind: &'static str,
}

impl FailureNotice {
    pub fn new(mutation: MutationId, kind: MutationKind, target: TaskId, error: &ApiError) -> Self {
        FailureNotice {
            mutation,
            kind,
            target,
            error: error.to_string(),
            error_kind: error.kind(),
        }
    }
}

/// Paging position of a list that loads page by page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Paging {
    pub page_size: u32,
    /// Next page to request
    pub next_page: u32,
    /// Unknown until the first page arrives
    pub total_pages: Option<u32>,
    pub total_count: usize,
}

impl Paging {
    pub fn new(page_size: u32) -> Self {
        Paging {
            page_size,
            next_page: 0,
            total_pages: None,
            total_count: 0,
        }
    }

    pub fn has_more(&self) -> bool {
        match self.total_pages {
            None => true,
            Some(total) => self.next_page < total,
        }
    }
}

/// Local-only transitions of a list's view state
#[derive(Debug, Clone, PartialEq)]
pub enum ListEvent {
    /// A page request went out
    PageRequested,
    /// Page `page` arrived; page 0 replaces the list, later pages append
    PageLoaded { page: u32, data: Page },
    PageFailed,
    /// A drag moved a row
    Moved(MoveEvent),
    Selected(Option<TaskId>),
}

/// View state of one list screen: the ordered items plus the bookkeeping the
/// screen renders from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListState {
    pub kind: ListKind,
    pub items: OrderedList,
    pub paging: Paging,
    pub loading: bool,
    pub selected: Option<TaskId>,
    #[serde(skip)]
    failures: VecDeque<FailureNotice>,
}

impl Default for ListState {
    fn default() -> Self {
        ListState::new(ListKind::default(), 0)
    }
}

impl ListState {
    pub fn new(kind: ListKind, page_size: u32) -> Self {
        ListState {
            kind,
            items: OrderedList::new(),
            paging: Paging::new(page_size),
            loading: false,
            selected: None,
            failures: VecDeque::new(),
        }
    }

    /// Whether a page request may go out now: nothing in flight and pages left.
    pub fn can_load_more(&self) -> bool {
        !self.loading && self.paging.has_more()
    }

    pub fn selected_item(&self) -> Option<&TaskItem> {
        self.selected.and_then(|id| self.items.get(id))
    }

    /// Reducer for local-only transitions
    pub fn apply(mut self, event: ListEvent) -> ListState {
        match event {
            ListEvent::PageRequested => {
                self.loading = true;
            }
            ListEvent::PageLoaded { page, data } => {
                if page == 0 {
                    self.items.replace_all(data.items);
                } else {
                    self.items.append_page(data.items);
                }
                self.paging.next_page = page + 1;
                self.paging.total_pages = Some(data.total_pages);
                self.paging.total_count = data.total_count;
                self.loading = false;
                if self.selected.is_some_and(|id| !self.items.contains(id)) {
                    self.selected = None;
                }
            }
            ListEvent::PageFailed => {
                self.loading = false;
            }
            ListEvent::Moved(MoveEvent { from, to }) => {
                if let Err(e) = self.items.reorder(from, to) {
                    tracing::debug!(from, to, error = %e, "ignoring out-of-range move");
                }
            }
            ListEvent::Selected(id) => {
                self.selected = id.filter(|id| self.items.contains(*id));
            }
        }
        self
    }

    pub(crate) fn push_failure(&mut self, notice: FailureNotice) {
        self.failures.push_back(notice);
    }

    pub fn pending_failures(&self) -> impl Iterator<Item = &FailureNotice> {
        self.failures.iter()
    }

    /// Hand queued failure notices to the presentation layer. Each notice is
    /// returned exactly once.
    pub fn take_failures(&mut self) -> Vec<FailureNotice> {
        self.failures.drain(..).collect()
    }
}
