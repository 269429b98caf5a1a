//! Link collection during markup production.

use std::sync::Arc;

use parking_lot::Mutex;

/// Clonable handle a render function uses to report emitted hrefs.
///
/// Hrefs are recorded in emission order; canonicalization and
/// deduplication happen in the crawler, so reporting the same href
/// twice is safe and cannot duplicate frontier entries.
#[derive(Debug, Clone, Default)]
pub struct LinkSink {
    links: Arc<Mutex<Vec<String>>>,
}

impl LinkSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one emitted href.
    pub fn push(&self, href: impl Into<String>) {
        self.links.lock().push(href.into());
    }

    /// Take every href recorded so far, in emission order.
    pub(crate) fn drain(&self) -> Vec<String> {
        std::mem::take(&mut *self.links.lock())
    }
}
