//! One list screen: state, coordinator and gestures on a single owner.
//!
//! Remote calls run as spawned tokio tasks. Their results come back over one
//! channel and are applied by whoever holds `&mut Board`, so list mutation
//! needs no locking.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};

use super::coordinator::{
    MutationCoordinator, MutationError, MutationId, MutationKind, MutationRequest, RemoteReply, Resolution,
};
use super::state::{FailureNotice, ListEvent, ListState};
use crate::api::{ApiError, TaskApi};
use crate::gesture::{GestureEvent, PointerGestures, ScrollJob, Viewport};
use crate::model::config::Config;
use crate::model::page::{ListKind, Page};
use crate::model::task::TaskId;

const SCROLL_TICK: Duration = Duration::from_millis(16);

/// Geometry of the rows on screen. Rows are a uniform height.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RowLayout {
    pub row_height: f32,
    pub height: f32,
    pub scroll: f32,
}

impl Default for RowLayout {
    fn default() -> Self {
        RowLayout {
            row_height: 100.0,
            height: 800.0,
            scroll: 0.0,
        }
    }
}

enum Completion {
    Mutation {
        id: MutationId,
        result: Result<RemoteReply, ApiError>,
    },
    Page {
        page: u32,
        result: Result<Page, ApiError>,
    },
    Scrolled(f32),
}

/// What applying one completion did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoardUpdate {
    Mutation(Resolution),
    PageLoaded { page: u32, items: usize },
    PageFailed { page: u32, error: String },
}

/// Result of feeding a gesture step to the board
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GestureOutcome {
    Ignored,
    Moved { from: usize, to: usize },
    Deleting(MutationId),
    Rejected(MutationError),
}

pub struct Board {
    state: ListState,
    coordinator: MutationCoordinator,
    gestures: PointerGestures,
    layout: RowLayout,
    api: Arc<dyn TaskApi>,
    tx: mpsc::UnboundedSender<Completion>,
    rx: mpsc::UnboundedReceiver<Completion>,
    /// Spawned remote calls whose completion has not been applied yet
    outstanding: usize,
    /// Item held by the active drag
    lifted: Option<TaskId>,
}

impl std::fmt::Debug for Board {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Board")
            .field("state", &self.state)
            .field("coordinator", &self.coordinator)
            .field("gestures", &self.gestures)
            .field("layout", &self.layout)
            .field("outstanding", &self.outstanding)
            .finish_non_exhaustive()
    }
}

impl Board {
    pub fn new(kind: ListKind, config: &Config, api: Arc<dyn TaskApi>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Board {
            state: ListState::new(kind, config.paging.page_size),
            coordinator: MutationCoordinator::new(),
            gestures: PointerGestures::new(
                config.lists.swipe_for(kind),
                config.gestures.swipe_threshold,
                config.gestures.overscroll_margin,
            ),
            layout: RowLayout::default(),
            api,
            tx,
            rx,
            outstanding: 0,
            lifted: None,
        }
    }

    pub fn with_layout(mut self, layout: RowLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn state(&self) -> &ListState {
        &self.state
    }

    pub fn coordinator(&self) -> &MutationCoordinator {
        &self.coordinator
    }

    pub fn gestures(&self) -> &PointerGestures {
        &self.gestures
    }

    pub fn layout(&self) -> RowLayout {
        self.layout
    }

    /// Remote calls spawned but not yet applied
    pub fn outstanding(&self) -> usize {
        self.outstanding
    }

    pub fn viewport(&self) -> Viewport {
        Viewport::uniform(
            self.state.items.len(),
            self.layout.row_height,
            self.layout.height,
            self.layout.scroll,
        )
    }

    pub fn select(&mut self, id: Option<TaskId>) {
        self.apply(ListEvent::Selected(id));
    }

    fn apply(&mut self, event: ListEvent) {
        self.state = std::mem::take(&mut self.state).apply(event);
    }

    /// Apply a mutation locally and send its remote call.
    pub fn submit(&mut self, request: MutationRequest) -> Result<MutationId, MutationError> {
        let issued = self.coordinator.begin(&mut self.state, request)?;
        let api = Arc::clone(&self.api);
        let tx = self.tx.clone();
        let id = issued.id;
        self.outstanding += 1;
        tokio::spawn(async move {
            let result = guarded(async move { issued.call.execute(api.as_ref()).await }).await;
            let _ = tx.send(Completion::Mutation { id, result });
        });
        Ok(id)
    }

    /// Request the next page unless one is already loading or none remain.
    pub fn load_next_page(&mut self) -> bool {
        if !self.state.can_load_more() {
            return false;
        }
        let page = self.state.paging.next_page;
        self.request_page(page);
        true
    }

    /// Reload from page 0, replacing the list once it arrives.
    pub fn refresh(&mut self) -> bool {
        if self.state.loading {
            return false;
        }
        self.request_page(0);
        true
    }

    fn request_page(&mut self, page: u32) {
        self.apply(ListEvent::PageRequested);
        let size = self.state.paging.page_size;
        let kind = self.state.kind;
        let api = Arc::clone(&self.api);
        let tx = self.tx.clone();
        self.outstanding += 1;
        tracing::debug!(kind = self.state.kind.name(), page, size, "requesting page");
        tokio::spawn(async move {
            let result = guarded(async move { api.fetch_page(kind, page, size).await }).await;
            let _ = tx.send(Completion::Page { page, result });
        });
    }

    pub fn long_press(&mut self, position: f32) -> bool {
        let viewport = self.viewport();
        let started = self.gestures.long_press(position, &viewport);
        self.lifted = self
            .gestures
            .drag()
            .lifted_index()
            .and_then(|index| self.state.items.items().get(index))
            .map(|item| item.id);
        started
    }

    pub fn horizontal_start(&mut self, item: TaskId) -> bool {
        self.gestures.horizontal_start(item)
    }

    /// Feed pointer movement; a drag may reorder the list and start or stop
    /// auto-scroll.
    pub fn pointer_move(&mut self, dx: f32, dy: f32) -> GestureOutcome {
        let viewport = self.viewport();
        let event = self.gestures.pointer_move(dx, dy, &viewport);
        let outcome = self.handle(event);

        let viewport = self.viewport();
        let tx = self.tx.clone();
        self.gestures
            .drag_mut()
            .update_auto_scroll(&viewport, move |amount| spawn_scroll(tx, amount));
        outcome
    }

    pub fn release(&mut self) -> GestureOutcome {
        self.lifted = None;
        let event = self.gestures.release();
        self.handle(event)
    }

    pub fn cancel_gesture(&mut self) {
        self.lifted = None;
        self.gestures.cancel();
    }

    /// Completions can insert or drop rows above a held one. Keep the drag
    /// on the row it lifted, or end it when that row has left the list.
    fn follow_lifted(&mut self) {
        let Some(id) = self.lifted else {
            return;
        };
        match self.state.items.position(id) {
            Some(index) => self.gestures.drag_mut().relocate(index),
            None => {
                tracing::debug!(%id, "lifted row left the list, ending drag");
                self.lifted = None;
                self.gestures.drag_mut().on_drag_cancel();
            }
        }
    }

    fn handle(&mut self, event: Option<GestureEvent>) -> GestureOutcome {
        match event {
            None => GestureOutcome::Ignored,
            Some(GestureEvent::Moved(mv)) => {
                self.apply(ListEvent::Moved(mv));
                GestureOutcome::Moved {
                    from: mv.from,
                    to: mv.to,
                }
            }
            Some(GestureEvent::Swiped(id)) => match self.submit(MutationRequest::Delete { id }) {
                Ok(mutation) => GestureOutcome::Deleting(mutation),
                Err(e) => {
                    tracing::debug!(%id, error = %e, "swipe delete rejected");
                    GestureOutcome::Rejected(e)
                }
            },
        }
    }

    /// Wait for the next remote call to finish and apply it. Returns `None`
    /// when nothing is outstanding. A hung call makes this wait forever.
    pub async fn process_next(&mut self) -> Option<BoardUpdate> {
        while self.outstanding > 0 {
            let completion = self.rx.recv().await?;
            if let Some(update) = self.apply_completion(completion) {
                return Some(update);
            }
        }
        None
    }

    /// Apply completions until every outstanding call has finished.
    pub async fn settle(&mut self) -> Vec<BoardUpdate> {
        let mut updates = Vec::new();
        while let Some(update) = self.process_next().await {
            updates.push(update);
        }
        updates
    }

    /// Apply whatever completions are ready without waiting on the rest.
    /// Calls that finish on their first poll are ready after a yield on a
    /// current-thread runtime.
    pub async fn drain_ready(&mut self) -> Vec<BoardUpdate> {
        let mut updates = Vec::new();
        loop {
            tokio::task::yield_now().await;
            let mut progressed = false;
            while let Ok(completion) = self.rx.try_recv() {
                progressed = true;
                if let Some(update) = self.apply_completion(completion) {
                    updates.push(update);
                }
            }
            if !progressed {
                return updates;
            }
        }
    }

    fn apply_completion(&mut self, completion: Completion) -> Option<BoardUpdate> {
        match completion {
            Completion::Scrolled(amount) => {
                let viewport = self.viewport();
                let content = viewport.total_items as f32 * self.layout.row_height;
                let max = (content - self.layout.height).max(0.0);
                self.layout.scroll = (self.layout.scroll + amount).clamp(0.0, max);
                None
            }
            Completion::Mutation { id, result } => {
                self.outstanding = self.outstanding.saturating_sub(1);
                let creating = self
                    .coordinator
                    .pending()
                    .find(|p| p.id == id && p.kind == MutationKind::Create)
                    .map(|p| p.target);
                let resolution = self.coordinator.resolve(&mut self.state, id, result);
                if let (Some(temp), Resolution::Committed { target, .. }) = (creating, &resolution) {
                    if self.lifted == Some(temp) {
                        self.lifted = Some(*target);
                    }
                }
                self.follow_lifted();
                Some(BoardUpdate::Mutation(resolution))
            }
            Completion::Page { page, result } => {
                self.outstanding = self.outstanding.saturating_sub(1);
                match result {
                    Ok(data) => {
                        let items = data.items.len();
                        self.apply(ListEvent::PageLoaded { page, data });
                        self.follow_lifted();
                        tracing::debug!(page, items, "page loaded");
                        Some(BoardUpdate::PageLoaded { page, items })
                    }
                    Err(error) => {
                        tracing::warn!(page, %error, "page load failed");
                        self.apply(ListEvent::PageFailed);
                        Some(BoardUpdate::PageFailed {
                            page,
                            error: error.to_string(),
                        })
                    }
                }
            }
        }
    }

    pub fn take_failures(&mut self) -> Vec<FailureNotice> {
        self.state.take_failures()
    }
}

/// Run a remote call on its own task so that a panic inside it still
/// produces a completion.
async fn guarded<T, F>(call: F) -> Result<T, ApiError>
where
    F: Future<Output = Result<T, ApiError>> + Send + 'static,
    T: Send + 'static,
{
    tokio::spawn(call).await.unwrap_or_else(|e| {
        tracing::error!(error = %e, "remote call did not complete");
        Err(ApiError::Network(format!("call did not complete: {}", e)))
    })
}

/// Auto-scroll task; the drag adjusts its rate while it runs
struct ScrollTicker {
    task: tokio::task::JoinHandle<()>,
    rate: watch::Sender<f32>,
}

impl ScrollJob for ScrollTicker {
    fn retarget(&mut self, amount: f32) {
        self.rate.send_replace(amount);
    }

    fn cancel(&mut self) {
        self.task.abort();
    }
}

/// Ticks the current scroll rate until aborted.
fn spawn_scroll(tx: mpsc::UnboundedSender<Completion>, amount: f32) -> Box<dyn ScrollJob> {
    let (rate, rx) = watch::channel(amount);
    let task = tokio::spawn(async move {
        let mut interval = tokio::time::interval(SCROLL_TICK);
        loop {
            interval.tick().await;
            let amount = *rx.borrow();
            if tx.send(Completion::Scrolled(amount)).is_err() {
                return;
            }
        }
    });
    Box::new(ScrollTicker { task, rate })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{CallKind, MemoryApi};
    use crate::model::task::{Deadline, TaskItem, TaskStatus};
    use pretty_assertions::assert_eq;

    /// In-memory backend whose bookmark endpoint panics
    struct CrashingBookmarks(MemoryApi);

    #[async_trait::async_trait]
    impl TaskApi for CrashingBookmarks {
        async fn fetch_page(&self, kind: ListKind, page: u32, size: u32) -> Result<Page, ApiError> {
            self.0.fetch_page(kind, page, size).await
        }

        async fn create_item(&self, content: &str) -> Result<TaskId, ApiError> {
            self.0.create_item(content).await
        }

        async fn delete_item(&self, id: TaskId) -> Result<(), ApiError> {
            self.0.delete_item(id).await
        }

        async fn update_status(&self, id: TaskId, status: TaskStatus) -> Result<(), ApiError> {
            self.0.update_status(id, status).await
        }

        async fn update_bookmark(&self, id: TaskId) -> Result<(), ApiError> {
            panic!("bookmark handler crashed on {}", id)
        }

        async fn update_deadline(&self, id: TaskId, deadline: Option<Deadline>) -> Result<(), ApiError> {
            self.0.update_deadline(id, deadline).await
        }
    }

    fn seeded(n: i64) -> Arc<MemoryApi> {
        Arc::new(MemoryApi::with_items(
            (1..=n).map(|i| TaskItem::new(TaskId(i), format!("task {}", i))).collect(),
        ))
    }

    async fn loaded_board(api: Arc<MemoryApi>) -> Board {
        let mut board = Board::new(ListKind::Backlog, &Config::default(), api);
        assert!(board.load_next_page());
        board.settle().await;
        board
    }

    fn ids(board: &Board) -> Vec<i64> {
        board.state().items.ids().iter().map(|id| id.0).collect()
    }

    #[tokio::test]
    async fn pages_load_in_order_and_stop_at_end() {
        let api = seeded(10);
        let mut board = loaded_board(Arc::clone(&api)).await;
        assert_eq!(ids(&board), (1..=8).collect::<Vec<_>>());

        assert!(board.load_next_page());
        // second request while loading is refused
        assert!(!board.load_next_page());
        board.settle().await;
        assert_eq!(ids(&board), (1..=10).collect::<Vec<_>>());
        assert!(!board.load_next_page());
        assert_eq!(api.calls(), vec![CallKind::Fetch, CallKind::Fetch]);
    }

    #[tokio::test]
    async fn swipe_past_threshold_deletes_and_commits() {
        let api = seeded(3);
        let mut board = loaded_board(Arc::clone(&api)).await;

        assert!(board.horizontal_start(TaskId(2)));
        board.pointer_move(-150.0, 0.0);
        board.pointer_move(-51.0, 0.0);
        let outcome = board.release();
        assert!(matches!(outcome, GestureOutcome::Deleting(_)));
        assert_eq!(ids(&board), vec![1, 3]);

        let updates = board.settle().await;
        assert!(matches!(
            updates.as_slice(),
            [BoardUpdate::Mutation(Resolution::Committed { kind: MutationKind::Delete, .. })]
        ));
        assert_eq!(ids(&board), vec![1, 3]);
        assert_eq!(api.items().len(), 2);
    }

    #[tokio::test]
    async fn failed_delete_rolls_back_with_one_notice() {
        let api = seeded(3);
        let mut board = loaded_board(Arc::clone(&api)).await;
        api.fail_next(CallKind::Delete, ApiError::Network("offline".into()));

        board.submit(MutationRequest::Delete { id: TaskId(2) }).unwrap();
        assert_eq!(ids(&board), vec![1, 3]);
        board.settle().await;
        assert_eq!(ids(&board), vec![1, 2, 3]);

        let failures = board.take_failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].target, TaskId(2));
        assert!(board.take_failures().is_empty());
    }

    #[tokio::test]
    async fn short_swipe_springs_back() {
        let api = seeded(3);
        let mut board = loaded_board(api).await;
        board.horizontal_start(TaskId(1));
        board.pointer_move(-199.0, 0.0);
        assert_eq!(board.release(), GestureOutcome::Ignored);
        assert_eq!(board.outstanding(), 0);
        assert_eq!(ids(&board), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn drag_reorders_locally_without_remote_call() {
        let api = seeded(3);
        let mut board = loaded_board(Arc::clone(&api)).await;
        assert!(board.long_press(50.0));
        let outcome = board.pointer_move(0.0, 120.0);
        assert_eq!(outcome, GestureOutcome::Moved { from: 0, to: 1 });
        board.release();
        assert_eq!(ids(&board), vec![2, 1, 3]);
        assert_eq!(board.outstanding(), 0);
        assert_eq!(api.calls(), vec![CallKind::Fetch]);
    }

    #[tokio::test]
    async fn create_rekeys_to_server_id() {
        let api = seeded(2);
        let mut board = loaded_board(Arc::clone(&api)).await;
        board
            .submit(MutationRequest::Create {
                content: "new".into(),
                at_index: 0,
            })
            .unwrap();
        assert_eq!(ids(&board), vec![-1, 1, 2]);
        board.settle().await;
        assert_eq!(ids(&board), vec![3, 1, 2]);
    }

    #[tokio::test]
    async fn hung_call_stays_in_flight() {
        let api = seeded(2);
        let mut board = loaded_board(Arc::clone(&api)).await;
        api.hang(CallKind::Status);
        let id = board
            .submit(MutationRequest::SetStatus {
                id: TaskId(1),
                status: TaskStatus::Completed,
            })
            .unwrap();
        assert!(board.drain_ready().await.is_empty());
        assert!(board.coordinator().is_in_flight(id));
        assert!(board.state().items.get(TaskId(1)).unwrap().is_completed());
    }

    #[tokio::test]
    async fn panicking_call_rolls_back_instead_of_hanging() {
        let items = (1..=2).map(|i| TaskItem::new(TaskId(i), format!("task {}", i))).collect();
        let api = Arc::new(CrashingBookmarks(MemoryApi::with_items(items)));
        let mut board = Board::new(ListKind::Backlog, &Config::default(), api);
        board.load_next_page();
        board.settle().await;

        board.submit(MutationRequest::ToggleBookmark { id: TaskId(1) }).unwrap();
        assert!(board.state().items.get(TaskId(1)).unwrap().bookmark);

        let updates = board.settle().await;
        let [BoardUpdate::Mutation(Resolution::RolledBack(notice))] = updates.as_slice() else {
            panic!("expected one rollback, got {:?}", updates);
        };
        assert_eq!(notice.error_kind, "network");
        assert_eq!(board.outstanding(), 0);
        assert!(!board.state().items.get(TaskId(1)).unwrap().bookmark);
    }

    #[tokio::test]
    async fn rollback_during_drag_keeps_lifted_row() {
        let api = seeded(4);
        let mut board = loaded_board(Arc::clone(&api)).await;
        api.fail_next(CallKind::Delete, ApiError::Network("offline".into()));
        board.submit(MutationRequest::Delete { id: TaskId(1) }).unwrap();
        assert_eq!(ids(&board), vec![2, 3, 4]);

        // lift item 3, then the failed delete puts item 1 back above it
        assert!(board.long_press(150.0));
        board.settle().await;
        assert_eq!(ids(&board), vec![1, 2, 3, 4]);
        assert_eq!(board.gestures().drag().lifted_index(), Some(2));

        let outcome = board.pointer_move(0.0, 210.0);
        assert_eq!(outcome, GestureOutcome::Moved { from: 2, to: 3 });
        board.release();
        assert_eq!(ids(&board), vec![1, 2, 4, 3]);
    }

    #[tokio::test]
    async fn drag_ends_when_lifted_row_is_rolled_back() {
        let api = seeded(2);
        let mut board = loaded_board(Arc::clone(&api)).await;
        api.fail_next(CallKind::Create, ApiError::Network("offline".into()));
        board
            .submit(MutationRequest::Create {
                content: "draft".into(),
                at_index: 0,
            })
            .unwrap();

        assert!(board.long_press(50.0));
        board.settle().await;
        assert_eq!(ids(&board), vec![1, 2]);
        assert!(board.gestures().is_idle());
        assert_eq!(board.pointer_move(0.0, 150.0), GestureOutcome::Ignored);
    }

    #[tokio::test]
    async fn drag_follows_created_row_through_rekey() {
        let api = seeded(2);
        let mut board = loaded_board(Arc::clone(&api)).await;
        board
            .submit(MutationRequest::Create {
                content: "draft".into(),
                at_index: 0,
            })
            .unwrap();

        assert!(board.long_press(50.0));
        board.settle().await;
        assert_eq!(ids(&board), vec![3, 1, 2]);
        assert_eq!(board.gestures().drag().lifted_index(), Some(0));
        assert_eq!(board.pointer_move(0.0, 101.0), GestureOutcome::Moved { from: 0, to: 1 });
        assert_eq!(ids(&board), vec![1, 3, 2]);
    }

    #[tokio::test]
    async fn scroll_job_ticks_at_latest_rate() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut job = spawn_scroll(tx, 4.0);
        job.retarget(9.0);
        let Some(Completion::Scrolled(amount)) = rx.recv().await else {
            panic!("expected a scroll tick");
        };
        assert_eq!(amount, 9.0);
        job.cancel();
    }

    #[tokio::test]
    async fn failed_page_clears_loading() {
        let api = seeded(2);
        api.fail_next(CallKind::Fetch, ApiError::Network("down".into()));
        let mut board = Board::new(ListKind::Today, &Config::default(), api);
        board.load_next_page();
        let updates = board.settle().await;
        assert!(matches!(updates.as_slice(), [BoardUpdate::PageFailed { page: 0, .. }]));
        assert!(!board.state().loading);
        assert!(board.state().items.is_empty());
    }
}
