use serde::{Deserialize, Serialize};

use crate::model::task::TaskId;

/// The one direction a list lets its rows be swiped away
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwipeDirection {
    Left,
    Right,
}

impl SwipeDirection {
    pub fn allows(self, delta: f32) -> bool {
        match self {
            SwipeDirection::Left => delta < 0.0,
            SwipeDirection::Right => delta > 0.0,
        }
    }
}

/// Result of lifting the pointer at the end of a swipe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwipeRelease {
    /// Threshold exceeded; the item should be removed
    Swiped(TaskId),
    /// Offset returned to zero
    SpringBack,
}

/// Horizontal offset of a single row during a swipe
#[derive(Debug, Clone, PartialEq)]
pub struct SwipeTracker {
    item: TaskId,
    direction: SwipeDirection,
    threshold: f32,
    offset: f32,
}

impl SwipeTracker {
    pub fn new(item: TaskId, direction: SwipeDirection, threshold: f32) -> Self {
        SwipeTracker {
            item,
            direction,
            threshold,
            offset: 0.0,
        }
    }

    pub fn item(&self) -> TaskId {
        self.item
    }

    pub fn offset(&self) -> f32 {
        self.offset
    }

    /// Accumulate a horizontal delta. Deltas against the allowed direction
    /// are dropped, never subtracted.
    pub fn on_drag(&mut self, delta: f32) -> f32 {
        if self.direction.allows(delta) {
            self.offset += delta;
        }
        self.offset
    }

    /// Finish the swipe. The offset is back at zero afterwards either way.
    pub fn on_release(&mut self) -> SwipeRelease {
        let swiped = self.offset.abs() > self.threshold;
        self.offset = 0.0;
        if swiped {
            tracing::debug!(item = %self.item, "swipe committed");
            SwipeRelease::Swiped(self.item)
        } else {
            SwipeRelease::SpringBack
        }
    }
}
