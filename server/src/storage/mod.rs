//! Version store.
//!
//! An in-memory, append-only, per-key history of writes. Each version
//! carries a visibility map computed by the anomaly model at write time;
//! the store only applies it:
//!
//! > a version is visible to node `N` at time `T` iff
//! > `T >= version.timestamp + version.visibility[N]`
//!
//! That single rule is what makes stale reads and replica lag observable.
//!
//! # Usage
//!
//! ```
//! use lagstore::storage::VersionStore;
//! use lagstore::types::{NodeId, Record};
//!
//! let store = VersionStore::new();
//! let visibility = [(NodeId(0), 0), (NodeId(1), 500)].into();
//! store
//!     .commit("usertable", "user1", Record::new().with("name", "ada"), NodeId(0), 1000, visibility)
//!     .unwrap();
//!
//! // The writer sees its own write immediately...
//! assert!(store.read_visible("usertable", "user1", 1000, NodeId(0), None).is_some());
//! // ...the other node only after 500ms.
//! assert!(store.read_visible("usertable", "user1", 1499, NodeId(1), None).is_none());
//! assert!(store.read_visible("usertable", "user1", 1500, NodeId(1), None).is_some());
//! ```

mod history;
pub mod time;
mod version_store;

pub use history::KeyHistory;
pub use time::{SystemTimeSource, TimeSource};
pub use version_store::{ScanIter, StoreError, VersionStore};
