//! CRM board state engine.
//!
//! - [`store`]: observable state container with optimistic transactions
//! - [`reconcile`]: stage/lead caches, fetch replacement, tombstones
//! - [`drag`]: drag gestures to stage-reorder / lead-move intents
//! - [`engine`]: the `Board` tying caches, drags, and the backend together
//! - [`notify`]: user-visible notifications
//! - [`filter`]: client-side lead filtering and sorting

pub mod drag;
pub mod engine;
pub mod filter;
pub mod notify;
pub mod reconcile;
pub mod store;

pub use drag::{DragCoordinator, DragEvent, DragId, Intent, LeadMove};
pub use engine::{Board, BoardError, MovePhase, Outcome, PendingDelete, PendingMove, PendingReorder};
pub use filter::{LeadFilter, LeadSort};
pub use notify::{Notice, NoticeLevel, Notifier};
pub use reconcile::{Column, FetchTicket, LeadStore, StageStore};
pub use store::{Change, MutationToken, Settled, Store, Transaction};
