//! Application layer for mediaroom
//!
//! Bridges session snapshots into the UI tree.
//!
//! # Components
//!
//! - [`StateContainer`]: attaches to a session's snapshot stream on mount and
//!   detaches on unmount
//! - [`StateContext`]: read-only ambient view handed to child consumers

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod container;

pub use container::{StateContainer, StateContext};
pub use mediaroom_core::{SessionState, SnapshotSource};
