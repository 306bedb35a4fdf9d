//! Process-wide worker bookkeeping.
//!
//! The registry is created on first use and never torn down. [`init`] is
//! idempotent and safe to call before any worker starts; [`crate::start`]
//! calls it implicitly. Workers are otherwise fully independent.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::OnceLock;

use tracing::debug;

static REGISTRY: OnceLock<Registry> = OnceLock::new();

struct Registry {
    next_id: AtomicU64,
    live: AtomicUsize,
}

fn registry() -> &'static Registry {
    REGISTRY.get_or_init(|| {
        debug!("initializing worker registry");
        Registry {
            next_id: AtomicU64::new(1),
            live: AtomicUsize::new(0),
        }
    })
}

/// Initialize the registry. Later calls do nothing.
pub fn init() {
    let _ = registry();
}

/// Number of workers whose teardown has not completed yet.
pub fn live_workers() -> usize {
    registry().live.load(Ordering::SeqCst)
}

/// A worker slot; released when dropped.
#[derive(Debug)]
pub(crate) struct Registration {
    id: u64,
}

impl Registration {
    pub(crate) fn acquire() -> Self {
        let registry = registry();
        let id = registry.next_id.fetch_add(1, Ordering::Relaxed);
        registry.live.fetch_add(1, Ordering::SeqCst);
        Self { id }
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        registry().live.fetch_sub(1, Ordering::SeqCst);
    }
}
