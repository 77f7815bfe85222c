use serde::{Deserialize, Serialize};

use crate::gesture::SwipeDirection;
use crate::model::page::ListKind;

/// Configuration from taskboard.toml
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub paging: PagingConfig,
    #[serde(default)]
    pub gestures: GestureConfig,
    #[serde(default)]
    pub lists: ListsConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Default: see DEFAULT_CONFIG_TEMPLATE
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Bearer token sent with every request, if set
    #[serde(default)]
    pub token: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        ApiConfig {
            base_url: default_base_url(),
            token: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PagingConfig {
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

impl Default for PagingConfig {
    fn default() -> Self {
        PagingConfig {
            page_size: default_page_size(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GestureConfig {
    /// Horizontal distance (logical px) a swipe must exceed to remove an item
    #[serde(default = "default_swipe_threshold")]
    pub swipe_threshold: f32,
    /// Distance from the viewport edge at which a dragged item starts auto-scrolling
    #[serde(default = "default_overscroll_margin")]
    pub overscroll_margin: f32,
}

impl Default for GestureConfig {
    fn default() -> Self {
        GestureConfig {
            swipe_threshold: default_swipe_threshold(),
            overscroll_margin: default_overscroll_margin(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListsConfig {
    #[serde(default = "default_backlog_swipe")]
    pub backlog_swipe: SwipeDirection,
    #[serde(default = "default_today_swipe")]
    pub today_swipe: SwipeDirection,
}

impl Default for ListsConfig {
    fn default() -> Self {
        ListsConfig {
            backlog_swipe: default_backlog_swipe(),
            today_swipe: default_today_swipe(),
        }
    }
}

impl ListsConfig {
    pub fn swipe_for(&self, kind: ListKind) -> SwipeDirection {
        match kind {
            ListKind::Backlog => self.backlog_swipe,
            ListKind::Today => self.today_swipe,
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_page_size() -> u32 {
    8
}

fn default_swipe_threshold() -> f32 {
    200.0
}

fn default_overscroll_margin() -> f32 {
    24.0
}

fn default_backlog_swipe() -> SwipeDirection {
    SwipeDirection::Left
}

fn default_today_swipe() -> SwipeDirection {
    SwipeDirection::Right
}
