//! Progress reporting, extracted as an explicit collaborator instead of
//! module-level logging plus a global print-delay timestamp.

use std::time::{Duration, Instant};

pub trait Reporter {
    fn report(&mut self, chunks_tested: usize, match_count: usize, matches_added: usize);
}

/// Emits at most once per `interval`, via `tracing::info!`.
pub struct ThrottledReporter {
    interval: Duration,
    last_emitted: Option<Instant>,
}

impl ThrottledReporter {
    pub fn new(interval: Duration) -> Self {
        ThrottledReporter {
            interval,
            last_emitted: None,
        }
    }
}

impl Default for ThrottledReporter {
    fn default() -> Self {
        ThrottledReporter::new(Duration::from_secs(2))
    }
}

impl Reporter for ThrottledReporter {
    fn report(&mut self, chunks_tested: usize, match_count: usize, matches_added: usize) {
        let now = Instant::now();
        let should_emit = match self.last_emitted {
            None => true,
            Some(last) => now.duration_since(last) >= self.interval,
        };
        if should_emit {
            self.last_emitted = Some(now);
            tracing::info!(
                chunks_tested,
                match_count,
                matches_added,
                "reducing: {} chunks done, found {} matches ({} added)",
                chunks_tested,
                match_count,
                matches_added
            );
        }
    }
}

/// No-op reporter, the default for library/test use.
#[derive(Default)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn report(&mut self, _chunks_tested: usize, _match_count: usize, _matches_added: usize) {}
}
