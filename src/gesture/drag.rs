//! Long-press drag to reorder.
//!
//! A [`DragSession`] is a plain value: feeding it pointer deltas together with
//! the current [`Viewport`] yields the next session and, when the lifted row's
//! centre passes the midpoint of a neighbouring slot, a [`MoveEvent`]. The
//! [`DragTracker`] wraps a session with the auto-scroll job that may be running
//! while the row is held near a viewport edge.

use serde::Serialize;

use super::layout::Viewport;

/// Reorder emitted while dragging: the lifted row moved from slot `from` to `to`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MoveEvent {
    pub from: usize,
    pub to: usize,
}

/// Handle to a repeating scroll task started while a row is held near an edge
pub trait ScrollJob: Send {
    /// Scroll by `amount` per tick from now on
    fn retarget(&mut self, amount: f32);
    fn cancel(&mut self);
}

/// State of one continuous drag, start to end/cancel
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragSession {
    /// Slot the lifted row currently occupies
    pub current_index: usize,
    initial_offset: f32,
    size: f32,
    dragged_distance: f32,
}

impl DragSession {
    /// Lift the row under `position`. None when the position hits no row.
    pub fn begin(position: f32, viewport: &Viewport) -> Option<Self> {
        let item = viewport.item_at(position)?;
        Some(DragSession {
            current_index: item.index,
            initial_offset: item.offset,
            size: item.size,
            dragged_distance: 0.0,
        })
    }

    pub fn dragged_distance(&self) -> f32 {
        self.dragged_distance
    }

    fn projected_start(&self) -> f32 {
        self.initial_offset + self.dragged_distance
    }

    fn projected_end(&self) -> f32 {
        self.projected_start() + self.size
    }

    fn projected_center(&self) -> f32 {
        self.projected_start() + self.size / 2.0
    }

    /// Accumulate `delta` and re-evaluate which slot the row belongs in.
    ///
    /// Walks outward from the current slot over neighbours whose centre the
    /// row's centre has passed, so a fast flick across several rows yields a
    /// single move to the farthest one. Targets come from laid-out rows only,
    /// which keeps them inside `0..total_items`.
    pub fn step(self, delta: f32, viewport: &Viewport) -> (DragSession, Option<MoveEvent>) {
        let mut next = self;
        next.dragged_distance += delta;

        let Some(current) = viewport.bounds(next.current_index) else {
            return (next, None);
        };
        let center = next.projected_center();
        let shift = next.projected_start() - current.offset;
        let last = viewport.total_items.saturating_sub(1);

        let mut target = next.current_index;
        if shift > 0.0 {
            while target < last {
                match viewport.bounds(target + 1) {
                    Some(b) if center > b.center() => target += 1,
                    _ => break,
                }
            }
        } else if shift < 0.0 {
            while target > 0 {
                match viewport.bounds(target - 1) {
                    Some(b) if center < b.center() => target -= 1,
                    _ => break,
                }
            }
        }

        if target == next.current_index {
            return (next, None);
        }
        let event = MoveEvent {
            from: next.current_index,
            to: target,
        };
        next.current_index = target;
        (next, Some(event))
    }

    /// Visual offset of the lifted row from its current slot. None while that
    /// slot is scrolled out of view.
    pub fn displacement(&self, viewport: &Viewport) -> Option<f32> {
        viewport
            .bounds(self.current_index)
            .map(|slot| self.projected_start() - slot.offset)
    }

    /// Signed scroll delta while the row is within `margin` of the edge it is
    /// being dragged towards, else 0.
    pub fn overscroll(&self, viewport: &Viewport, margin: f32) -> f32 {
        if self.dragged_distance > 0.0 {
            let diff = self.projected_end() + margin - viewport.end;
            if diff > 0.0 { diff } else { 0.0 }
        } else if self.dragged_distance < 0.0 {
            let diff = self.projected_start() - margin - viewport.start;
            if diff < 0.0 { diff } else { 0.0 }
        } else {
            0.0
        }
    }
}

/// Owns the active drag session and its auto-scroll job
pub struct DragTracker {
    session: Option<DragSession>,
    scroll_job: Option<Box<dyn ScrollJob>>,
    overscroll_margin: f32,
}

impl DragTracker {
    pub fn new(overscroll_margin: f32) -> Self {
        DragTracker {
            session: None,
            scroll_job: None,
            overscroll_margin,
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.session.is_some()
    }

    pub fn session(&self) -> Option<&DragSession> {
        self.session.as_ref()
    }

    pub fn lifted_index(&self) -> Option<usize> {
        self.session.map(|s| s.current_index)
    }

    pub fn is_auto_scrolling(&self) -> bool {
        self.scroll_job.is_some()
    }

    /// The lifted row now sits at `index` because the list changed under it.
    pub fn relocate(&mut self, index: usize) {
        if let Some(session) = self.session.as_mut() {
            session.current_index = index;
        }
    }

    /// Begin a drag at `position`. Any previous session is torn down first,
    /// including its scroll job. Returns false when no row was hit.
    pub fn on_drag_start(&mut self, position: f32, viewport: &Viewport) -> bool {
        self.teardown();
        self.session = DragSession::begin(position, viewport);
        if let Some(session) = &self.session {
            tracing::debug!(index = session.current_index, "drag started");
        }
        self.session.is_some()
    }

    /// Feed a pointer delta. Without an active session this does nothing.
    pub fn on_drag(&mut self, delta: f32, viewport: &Viewport) -> Option<MoveEvent> {
        let session = self.session.take()?;
        let (next, event) = session.step(delta, viewport);
        self.session = Some(next);
        event
    }

    pub fn on_drag_end(&mut self) {
        self.teardown();
    }

    pub fn on_drag_cancel(&mut self) {
        self.teardown();
    }

    pub fn displacement(&self, viewport: &Viewport) -> Option<f32> {
        self.session.and_then(|s| s.displacement(viewport))
    }

    pub fn check_for_overscroll(&self, viewport: &Viewport) -> f32 {
        self.session
            .map(|s| s.overscroll(viewport, self.overscroll_margin))
            .unwrap_or(0.0)
    }

    /// Keep the auto-scroll job in step with the overscroll condition: start
    /// one through `start` when scrolling is needed and none is running,
    /// retarget a running one, and cancel it as soon as the condition clears.
    pub fn update_auto_scroll<F>(&mut self, viewport: &Viewport, start: F) -> f32
    where
        F: FnOnce(f32) -> Box<dyn ScrollJob>,
    {
        let delta = self.check_for_overscroll(viewport);
        if delta != 0.0 {
            match self.scroll_job.as_mut() {
                Some(job) => job.retarget(delta),
                None => self.scroll_job = Some(start(delta)),
            }
        } else {
            self.cancel_scroll();
        }
        delta
    }

    fn cancel_scroll(&mut self) {
        if let Some(mut job) = self.scroll_job.take() {
            job.cancel();
        }
    }

    fn teardown(&mut self) {
        self.cancel_scroll();
        self.session = None;
    }
}

impl std::fmt::Debug for DragTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DragTracker")
            .field("session", &self.session)
            .field("auto_scrolling", &self.scroll_job.is_some())
            .field("overscroll_margin", &self.overscroll_margin)
            .finish()
    }
}
