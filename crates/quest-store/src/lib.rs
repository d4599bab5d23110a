//! Quest Local Progress Store
//!
//! Durable, per-identity persistence of tasks and goals, independent of
//! network reachability. Writes are synchronous and immediately visible.
//!
//! # Architecture
//!
//! ```text
//! ProgressStore ──► StoreBackend (tasks_<address>, goals_<address>, seq_<address>)
//!      │                 ├── MemoryBackend
//!      │                 └── FileBackend (one JSON file per key)
//!      ▼
//! derive_snapshot ──► LocalSnapshot
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod backend;
pub mod error;
pub mod snapshot;
pub mod store;

pub use backend::{FileBackend, MemoryBackend, StoreBackend};
pub use error::{RecordKind, StoreError, StoreResult};
pub use snapshot::derive_snapshot;
pub use store::ProgressStore;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
