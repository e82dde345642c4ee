//! The bisection engine: recursive depth-first search over a byte range
//! against the scanner oracle, producing the minimal set of byte ranges
//! necessary for detection.
//!
//! Ported from the original `Reducer._scanDataPart` bisection, kept
//! step-for-step: same four-way branch on (top_null detects, bot_null
//! detects), same dangling-bytes and min-match-size terminators, same
//! adaptive throttling table.

use crate::data::Data;
use crate::error::Result;
use crate::interval::IntervalStore;
use crate::reporter::{NullReporter, Reporter};
use crate::scanner::Scanner;
use crate::section::FileAdapter;

/// A half-open byte range in file-absolute coordinates that the reducer
/// believes is necessary for detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Match {
    pub begin: usize,
    pub end: usize,
    /// Index assigned in sorted output order, monotonically increasing
    /// across calls to the same `Reducer` instance.
    pub index: usize,
    /// Which `scan()` call on the owning `Reducer` produced this match.
    pub iteration: usize,
}

impl Match {
    pub fn len(&self) -> usize {
        self.end - self.begin
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.begin
    }
}

/// Tuning preset trading precision for termination speed. See the
/// `(base, div)` table in [`ScanSpeed::throttle_params`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanSpeed {
    Fast,
    Normal,
    Slow,
    Complete,
}

impl ScanSpeed {
    fn initial_min_match_size(self) -> usize {
        match self {
            ScanSpeed::Fast => 16,
            _ => 8,
        }
    }

    /// `(chunks_test_base, chunks_test_div)`: once `chunks_tested >= base`
    /// and `chunks_tested % div == 0`, `min_match_size` doubles.
    fn throttle_params(self) -> (usize, usize) {
        match self {
            ScanSpeed::Fast => (50, 50),
            ScanSpeed::Normal => (120, 60),
            ScanSpeed::Slow => (200, 100),
            ScanSpeed::Complete => (10_000, 10_000),
        }
    }
}

struct ReducerState {
    store: IntervalStore,
    chunks_tested: usize,
    matches_added: usize,
    iterations: usize,
    match_idx: usize,
    min_match_size: usize,
}

/// `Reducer::scan(lo, hi)` reinitializes the interval store on every
/// call; `iterations`/`match_idx` persist across calls on the same
/// instance so callers can concatenate results from multiple `scan`
/// invocations with globally increasing match identity.
pub struct Reducer<'a> {
    file: &'a dyn FileAdapter,
    scanner: &'a dyn Scanner,
    scan_speed: ScanSpeed,
    reporter: Box<dyn Reporter + 'a>,
    state: ReducerState,
}

impl<'a> Reducer<'a> {
    pub fn new(file: &'a dyn FileAdapter, scanner: &'a dyn Scanner, scan_speed: ScanSpeed) -> Self {
        Reducer {
            file,
            scanner,
            scan_speed,
            reporter: Box::new(NullReporter),
            state: ReducerState {
                store: IntervalStore::new(),
                chunks_tested: 0,
                matches_added: 0,
                iterations: 0,
                match_idx: 0,
                min_match_size: scan_speed.initial_min_match_size(),
            },
        }
    }

    pub fn with_reporter(mut self, reporter: Box<dyn Reporter + 'a>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Chunks tested during the most recent `scan()` call.
    pub fn chunks_tested(&self) -> usize {
        self.state.chunks_tested
    }

    /// Matches added to the interval store during the most recent
    /// `scan()` call, before merging.
    pub fn matches_added(&self) -> usize {
        self.state.matches_added
    }

    /// Scans `[lo, hi)` against the current carrier (the file's own,
    /// unmasked data) and returns matches sorted by `begin`.
    ///
    /// Precondition: the scanner detects the original unmodified file.
    pub fn scan(&mut self, lo: usize, hi: usize) -> Result<Vec<Match>> {
        // Per-call state: the interval store and the chunk/match counters
        // reset on every scan(); only `iterations` and `match_idx` persist
        // across calls on this instance, to keep match identity globally
        // ordered when a caller concatenates results from multiple scans
        // (e.g. one per attributed section).
        self.state.store = IntervalStore::new();
        self.state.chunks_tested = 0;
        self.state.matches_added = 0;
        let data = self.file.data();

        tracing::info!(
            scan_speed = ?self.scan_speed,
            iteration = self.state.iterations,
            "reducer start"
        );

        self.scan_data_part(&data, lo, hi)?;

        tracing::info!(
            chunks_tested = self.state.chunks_tested,
            matches_added = self.state.matches_added,
            matches_final = self.state.store.count(),
            "reducer result"
        );

        let mut sorted = self.state.store.drain_sorted();
        sorted.sort_by_key(|&(begin, _)| begin);

        let iteration = self.state.iterations;
        let mut idx = self.state.match_idx;
        let matches: Vec<Match> = sorted
            .into_iter()
            .map(|(begin, end)| {
                let m = Match {
                    begin,
                    end,
                    index: idx,
                    iteration,
                };
                idx += 1;
                m
            })
            .collect();

        self.state.match_idx = idx;
        self.state.iterations += 1;

        Ok(matches)
    }

    fn scan_data(&self, data: &Data) -> Result<bool> {
        let bytes = self.file.file_data_with(data)?;
        self.scanner.scan(&bytes, self.file.filename())
    }

    fn add_match(&mut self, lo: usize, hi: usize) -> Result<()> {
        self.state.store.add(lo, hi)?;
        self.state.matches_added += 1;
        Ok(())
    }

    fn maybe_throttle(&mut self) {
        let (base, div) = self.scan_speed.throttle_params();
        if self.state.chunks_tested >= base && self.state.chunks_tested % div == 0 {
            self.state.min_match_size *= 2;
            tracing::warn!(
                new_min_match_size = self.state.min_match_size,
                "doubling min_match_size"
            );
        }
    }

    fn scan_data_part(&mut self, data: &Data, section_start: usize, section_end: usize) -> Result<()> {
        let size = section_end - section_start;
        let chunk_size = size / 2;

        self.state.chunks_tested += 1;
        self.reporter.report(
            self.state.chunks_tested,
            self.state.store.count(),
            self.state.matches_added,
        );
        self.maybe_throttle();

        // Dangling-bytes terminator: these bytes are already known to be
        // needed (that's why they are being scanned), so just record them.
        if chunk_size <= 2 {
            self.add_match(section_start, section_end)?;
            return Ok(());
        }

        let top_null = data.fill(section_start, chunk_size);
        let bot_null = data.fill(section_start + chunk_size, chunk_size);

        let detect_top_null = self.scan_data(&top_null)?;
        let detect_bot_null = self.scan_data(&bot_null)?;

        match (detect_top_null, detect_bot_null) {
            (true, true) => {
                // Signature straddles both halves independently. Recurse
                // into each half carrying the OTHER half's nulled variant,
                // so each recursion is isolated from the other half's
                // contribution to detection.
                self.scan_data_part(&bot_null, section_start, section_start + chunk_size)?;
                self.scan_data_part(&top_null, section_start + chunk_size, section_end)?;
            }
            (false, false) => {
                // Neither half alone still detects: signature spans the
                // midpoint.
                if chunk_size <= self.state.min_match_size {
                    // NOTE: this intentionally records [section_start,
                    // section_start + size), i.e. the *whole current
                    // range* computed from the original section_end
                    // parameter at function entry — not
                    // [section_start, section_start + chunk_size). This
                    // mirrors the original implementation and is
                    // preserved rather than "corrected"; see DESIGN.md.
                    self.add_match(section_start, section_start + size)?;
                } else {
                    // Narrow further, but on the *original* (un-nulled)
                    // carrier — a nulled carrier wouldn't converge here
                    // since neither half detects on its own.
                    self.scan_data_part(data, section_start, section_start + chunk_size)?;
                    self.scan_data_part(data, section_start + chunk_size, section_end)?;
                }
            }
            (false, true) => {
                // Top-null no longer detects: necessary bytes are in the top half.
                self.scan_data_part(data, section_start, section_start + chunk_size)?;
            }
            (true, false) => {
                // Bot-null no longer detects: necessary bytes are in the bottom half.
                self.scan_data_part(data, section_start + chunk_size, section_end)?;
            }
        }

        Ok(())
    }
}

/// A straightforward, unreconstructed-from-source fallback for
/// `AnalyzeOptions::new_algorithm == false`: slides a fixed-size window
/// across the range, nulls each window against the otherwise-unmodified
/// file, and records any window whose nulling flips detection to false.
/// O(n/window) scanner calls; offered for algorithm-choice parity, not
/// tuned for speed or precision like the bisection engine.
pub fn legacy_linear_scan(
    file: &dyn FileAdapter,
    scanner: &dyn Scanner,
    lo: usize,
    hi: usize,
    window: usize,
) -> Result<Vec<Match>> {
    assert!(window > 0, "window must be positive");
    let data = file.data();
    let mut store = IntervalStore::new();

    let mut pos = lo;
    while pos < hi {
        let end = (pos + window).min(hi);
        let masked = data.fill(pos, end - pos);
        let bytes = file.file_data_with(&masked)?;
        let still_detects = scanner.scan(&bytes, file.filename())?;
        if !still_detects {
            store.add(pos, end)?;
        }
        pos = end;
    }

    let matches = store
        .drain_sorted()
        .into_iter()
        .enumerate()
        .map(|(index, (begin, end))| Match {
            begin,
            end,
            index,
            iteration: 0,
        })
        .collect();
    Ok(matches)
}
