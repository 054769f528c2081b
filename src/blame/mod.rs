// Blame module.
// Per-file memoized fetching, age heat-map bucketing, and hover rendering.

pub mod cache;
pub mod fetcher;
pub mod heat;
pub mod hover;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::github::BlameRange;
use crate::workspace::{ProviderLocation, RevisionInfo};

pub use fetcher::BlameFetcher;
pub use heat::{Editor, HeatRenderer, LineRange, range_at_line};
pub use hover::HoverFormatter;

/// Normalized blame of one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlameFile {
    pub location: ProviderLocation,
    pub revision: RevisionInfo,
    pub ranges: Vec<BlameRange>,
}

/// Caller-owned cancellation flag. Clones share the flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
