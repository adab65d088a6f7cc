use std::sync::atomic::{AtomicUsize, Ordering};

use petal::register_component;

static RUNS: AtomicUsize = AtomicUsize::new(0);

/// `jobs.reindex`; not memoized, so every resolution is a new run.
#[derive(Debug)]
pub struct Reindex {
    pub run: usize,
}

#[register_component("Bookshelf::Jobs::Reindex")]
fn reindex() -> Reindex {
    Reindex {
        run: RUNS.fetch_add(1, Ordering::SeqCst) + 1,
    }
}
