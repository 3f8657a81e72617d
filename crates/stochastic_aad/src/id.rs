//! Process-wide node id service.
//!
//! Every operator-tree node, in every graph built by the process, draws its
//! id from a single [`IdGenerator`]. Ids start at 0, strictly increase in
//! creation order and are never reused or reset, so a node's id is always
//! larger than the ids of its arguments. The gradient propagator depends on
//! this ordering.
//!
//! Allocation is a lock-free `fetch_add`, so graphs may be built on several
//! threads at once.

use std::sync::atomic::{AtomicU64, Ordering};

static GLOBAL: IdGenerator = IdGenerator::new();

/// Atomic, monotonically increasing id counter.
#[derive(Debug)]
pub struct IdGenerator {
    next: AtomicU64,
}

impl IdGenerator {
    /// Creates a counter starting at 0.
    ///
    /// Nodes always use [`IdGenerator::global`]; separate instances are only
    /// useful for tests of the counter itself.
    pub const fn new() -> Self {
        Self {
            next: AtomicU64::new(0),
        }
    }

    /// The process-wide instance shared by all graphs.
    #[inline]
    pub fn global() -> &'static IdGenerator {
        &GLOBAL
    }

    /// Draws the next id.
    #[inline]
    pub fn next_id(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }

    /// The id the next call to [`IdGenerator::next_id`] would return.
    #[inline]
    pub fn peek(&self) -> u64 {
        self.next.load(Ordering::Relaxed)
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}
