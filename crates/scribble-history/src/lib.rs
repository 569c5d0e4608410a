//! Change tracking and undo/redo for scribble documents.
//!
//! The [`Store`] diffs committed states against its [`Snapshot`] and emits
//! [`StoreIncrement`]s; [`History`] records them and replays them backwards or
//! forwards, reconciling each entry with edits made by other peers since it
//! was recorded.

pub mod app_state_change;
pub mod delta;
pub mod elements_change;
pub mod error;
pub mod history;
pub mod partial;
pub mod snapshot;
pub mod store;

pub use app_state_change::AppStateChange;
pub use delta::{Delta, DeltaSide, Diffable, Partial};
pub use elements_change::{Bucket, ElementDelta, ElementsChange};
pub use error::{Error, Result};
pub use history::{History, HistoryConfig, HistoryEntry};
pub use partial::{AppStateField, AppStateValue, ElementField, ElementPartial, ElementValue};
pub use snapshot::{Snapshot, SnapshotMeta};
pub use store::{Store, StoreAction, StoreIncrement, SubscriptionId};
