use serde::{Deserialize, Serialize};

use super::task::TaskItem;

/// One page of a server list fetch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub items: Vec<TaskItem>,
    pub total_count: usize,
    pub total_pages: u32,
}

impl Page {
    pub fn new(items: Vec<TaskItem>, total_count: usize, total_pages: u32) -> Self {
        Page {
            items,
            total_count,
            total_pages,
        }
    }
}

/// Which server list a board shows
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ListKind {
    #[default]
    Backlog,
    Today,
}

impl ListKind {
    pub fn name(self) -> &'static str {
        match self {
            ListKind::Backlog => "backlog",
            ListKind::Today => "today",
        }
    }
}
