//! TTL-bounded in-memory caches.

pub mod expiring;
pub mod snapshot;

pub use expiring::ExpiringIndex;
pub use snapshot::{HttpSnapshotSource, SnapshotCache, SnapshotSource};
