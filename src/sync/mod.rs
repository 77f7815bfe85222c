pub mod board;
pub mod coordinator;
pub mod state;

pub use board::{Board, BoardUpdate, GestureOutcome, RowLayout};
pub use coordinator::{
    Issued, MutationCoordinator, MutationError, MutationId, MutationKind, MutationRequest,
    PendingMutation, RemoteCall, RemoteReply, Resolution,
};
pub use state::{FailureNotice, ListEvent, ListState, Paging};
