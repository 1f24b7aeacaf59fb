//! Object identity and the creation-time ledger used for age-based eviction

use dashmap::DashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

static NEXT_OBJECT_ID: AtomicU64 = AtomicU64::new(1);

/// Stable handle assigned to every pooled object when it is created.
///
/// Ids are unique for the lifetime of the process, across all pools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(u64);

impl ObjectId {
    pub(crate) fn next() -> Self {
        Self(NEXT_OBJECT_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// The raw id value
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Creation times of live objects. Only populated when a max age is set.
pub(crate) struct AgeLedger {
    created: DashMap<ObjectId, Instant>,
    max_age: Option<Duration>,
}

impl AgeLedger {
    pub fn new(max_age: Option<Duration>) -> Self {
        Self {
            created: DashMap::new(),
            max_age,
        }
    }

    pub fn track(&self, id: ObjectId) {
        if self.max_age.is_some() {
            self.created.insert(id, Instant::now());
        }
    }

    /// An untracked id is reported as expired.
    pub fn is_expired(&self, id: ObjectId) -> bool {
        let Some(max_age) = self.max_age else {
            return false;
        };

        match self.created.get(&id) {
            Some(created_at) => created_at.elapsed() > max_age,
            None => {
                tracing::debug!(object = %id, "object missing from age ledger");
                true
            }
        }
    }

    pub fn forget(&self, id: ObjectId) {
        self.created.remove(&id);
    }

    pub fn len(&self) -> usize {
        self.created.len()
    }
}
