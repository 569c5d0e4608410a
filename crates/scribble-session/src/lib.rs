//! Editing session runtime for scribble.
//!
//! A [`Session`] owns the live scene of one participant, commits local edits
//! through the history [`Store`](scribble_history::Store), merges remote
//! updates and drives undo/redo.

pub mod config;
pub mod error;
pub mod remote;
pub mod session;

pub use config::SessionConfig;
pub use error::{Result, SessionError};
pub use remote::{reconcile_remote, remote_wins};
pub use session::Session;
