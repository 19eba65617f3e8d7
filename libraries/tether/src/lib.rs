//! This is a library for keeping a client-side copy of a user's data in step with a hosted copy.
//! It was created for Boostpad, so it doesn't include much that was not needed for that project.
//!
//! Syncing strategy:
//! 1. Every piece of state lives in a named "collection" (completed days, saved drills, ...).
//! 2. The app writes to the local copy first, so everything works offline.
//! 3. A reconciliation pass for one collection then:
//!   1. Fetches the user's rows from the remote store (a failed fetch ends the pass, leaving the local copy alone).
//!   2. Reads the local copy and merges the two, using the collection's identity key.
//!   3. Upserts whatever the remote store is missing, keyed by that identity, so repeating a pass never duplicates rows.
//!   4. Writes the merged view back as the new local copy.
//!
//! Running a pass twice with nothing changed in between uploads nothing and changes nothing.

pub mod collection;
pub mod reconcile;
pub mod remote;
pub mod snapshot;
pub mod status;

#[cfg(feature = "supabase")]
pub mod supabase;

pub use collection::{Collection, Merged};
pub use reconcile::{Reconciler, SyncReport};
pub use remote::{Filter, MemoryRemote, Order, RemoteError, RemoteStore};
pub use snapshot::{LocalSnapshots, MemoryStorage, SnapshotStore, StorageError};
pub use status::{ListenerKey, SyncBoard, SyncStatus};

#[cfg(not(target_arch = "wasm32"))]
pub use snapshot::FileStorage;

#[cfg(target_arch = "wasm32")]
pub use snapshot::WebStorage;

/// The authenticated user a pass runs on behalf of.
///
/// Passed explicitly into every remote operation; there is no ambient session.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct UserContext {
    pub user_id: String,
}

impl UserContext {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
        }
    }
}
