pub mod drag;
pub mod layout;
pub mod swipe;

pub use drag::{DragSession, DragTracker, MoveEvent, ScrollJob};
pub use layout::{ItemBounds, Viewport};
pub use swipe::{SwipeDirection, SwipeRelease, SwipeTracker};

use crate::model::task::TaskId;

/// Something a pointer sequence asks the list to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureEvent {
    Moved(MoveEvent),
    Swiped(TaskId),
}

/// Routes one pointer sequence to either the drag tracker or a swipe tracker,
/// never both. Whichever gesture is recognised first owns the sequence until
/// release or cancel; the other recogniser is ignored meanwhile.
#[derive(Debug)]
pub struct PointerGestures {
    drag: DragTracker,
    swipe: Option<SwipeTracker>,
    swipe_direction: SwipeDirection,
    swipe_threshold: f32,
}

impl PointerGestures {
    pub fn new(swipe_direction: SwipeDirection, swipe_threshold: f32, overscroll_margin: f32) -> Self {
        PointerGestures {
            drag: DragTracker::new(overscroll_margin),
            swipe: None,
            swipe_direction,
            swipe_threshold,
        }
    }

    pub fn drag(&self) -> &DragTracker {
        &self.drag
    }

    pub fn drag_mut(&mut self) -> &mut DragTracker {
        &mut self.drag
    }

    pub fn swipe(&self) -> Option<&SwipeTracker> {
        self.swipe.as_ref()
    }

    pub fn is_idle(&self) -> bool {
        !self.drag.is_dragging() && self.swipe.is_none()
    }

    /// Long press recognised at `position`: lift the row there.
    pub fn long_press(&mut self, position: f32, viewport: &Viewport) -> bool {
        if self.swipe.is_some() {
            return false;
        }
        self.drag.on_drag_start(position, viewport)
    }

    /// Horizontal drag recognised on `item` without a long press.
    pub fn horizontal_start(&mut self, item: TaskId) -> bool {
        if !self.is_idle() {
            return false;
        }
        self.swipe = Some(SwipeTracker::new(
            item,
            self.swipe_direction,
            self.swipe_threshold,
        ));
        true
    }

    /// Feed pointer movement. Vertical travel goes to an active drag,
    /// horizontal travel to an active swipe.
    pub fn pointer_move(&mut self, dx: f32, dy: f32, viewport: &Viewport) -> Option<GestureEvent> {
        if let Some(swipe) = self.swipe.as_mut() {
            swipe.on_drag(dx);
            return None;
        }
        self.drag.on_drag(dy, viewport).map(GestureEvent::Moved)
    }

    /// Pointer lifted: end whichever gesture owned the sequence.
    pub fn release(&mut self) -> Option<GestureEvent> {
        if let Some(mut swipe) = self.swipe.take() {
            return match swipe.on_release() {
                SwipeRelease::Swiped(id) => Some(GestureEvent::Swiped(id)),
                SwipeRelease::SpringBack => None,
            };
        }
        self.drag.on_drag_end();
        None
    }

    pub fn cancel(&mut self) {
        self.swipe = None;
        self.drag.on_drag_cancel();
    }
}
