use std::{fmt::Display, sync::atomic::{AtomicU64, Ordering}};

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

static NEXT_ID: AtomicU64 = AtomicU64::new(0);

/// Token identifying this process, so ids minted by different processes never collide.
static PROCESS_INSTANCE: Lazy<Uuid> = Lazy::new(Uuid::new_v4);

/// Process-wide unique identifier of a named expression.
///
/// Two attributes carrying the same `ExprId` refer to the same column, whatever
/// their name or qualifier says.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ExprId {
    /// Monotonic per-process counter value
    pub id: u64,
    /// Instance token of the process that minted the id
    pub instance: Uuid,
}

impl ExprId {
    /// Mint a fresh id. Safe to call concurrently from any thread.
    pub fn new_id() -> Self {
        Self {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            instance: *PROCESS_INSTANCE,
        }
    }

    /// Rebuild an id minted by this process, e.g. when rehydrating a serialized tree.
    pub fn with_id(id: u64) -> Self {
        Self { id, instance: *PROCESS_INSTANCE }
    }

    /// Rebuild an id minted by another process.
    pub fn from_parts(id: u64, instance: Uuid) -> Self {
        Self { id, instance }
    }

    pub fn process_instance() -> Uuid {
        *PROCESS_INSTANCE
    }
}

impl Display for ExprId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id)
    }
}
