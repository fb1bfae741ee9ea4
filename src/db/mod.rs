//! Database layer (Firestore, with an in-memory backend for development).

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreDb;
pub use memory::MemoryStore;

/// Collection names as constants.
pub mod collections {
    pub const ACCOUNTS: &str = "accounts";
    pub const INTEGRATIONS: &str = "integrations";
    pub const ACTIVITIES: &str = "activities";
    /// Applied migration IDs
    pub const CHANGELOG: &str = "changelog";
    /// Declared field indexes (Firestore manages the physical indexes)
    pub const INDEXES: &str = "_indexes";
}
