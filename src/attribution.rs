//! Section-attribution: narrows detection to the structural regions of
//! the file that independently matter, so the reducer never has to run
//! across the whole file when one section is decisive.

use rayon::prelude::*;

use crate::data::Data;
use crate::error::{Error, Result};
use crate::section::{FileAdapter, Section};
use crate::scanner::Scanner;

const MAX_ZERO_SECTION_CANDIDATES: usize = 3;

/// Fills every byte outside `keep` with null bytes.
fn mask_all_except(data: &Data, keep: &Section) -> Data {
    let mut masked = data.clone();
    if keep.addr > 0 {
        masked = masked.fill(0, keep.addr);
    }
    let tail_start = keep.end();
    let total = data.len();
    if tail_start < total {
        masked = masked.fill(tail_start, total - tail_start);
    }
    masked
}

/// Zero-section (subtract) strategy: nulls one section at a time,
/// leaving everything else intact. A section is "responsible" when
/// nulling it alone suppresses detection.
pub fn find_detected_sections_zero(
    file: &dyn FileAdapter,
    scanner: &dyn Scanner,
) -> Result<Vec<Section>> {
    let data = file.data();
    let mut detected = Vec::new();
    for section in file.sections() {
        let masked = data.fill(section.addr, section.size);
        let bytes = file.file_data_with(&masked)?;
        let still_detected = scanner.scan(&bytes, file.filename())?;
        tracing::info!(section = %section.name, still_detected, "zero-section attribution");
        if !still_detected {
            detected.push(section.clone());
        }
    }
    Ok(detected)
}

/// Isolate (mask-all-others) strategy: nulls everything except one
/// section at a time. A section is "independently sufficient" when it
/// alone, with everything else nulled, still triggers detection.
pub fn find_detected_sections_isolate(
    file: &dyn FileAdapter,
    scanner: &dyn Scanner,
) -> Result<Vec<Section>> {
    let data = file.data();
    let mut detected = Vec::new();
    for section in file.sections() {
        let masked = mask_all_except(&data, section);
        let bytes = file.file_data_with(&masked)?;
        let still_detected = scanner.scan(&bytes, file.filename())?;
        tracing::info!(section = %section.name, still_detected, "isolate attribution");
        if still_detected {
            detected.push(section.clone());
        }
    }
    Ok(detected)
}

/// Same as [`find_detected_sections_isolate`], but fans the independent
/// per-section scanner calls out across a rayon thread pool. Only valid
/// when the scanner is `Sync` — an optional implementation choice per
/// spec §5, not a correctness requirement.
pub fn find_detected_sections_isolate_parallel(
    file: &(dyn FileAdapter + Sync),
    scanner: &(dyn Scanner + Sync),
) -> Result<Vec<Section>> {
    let data = file.data();
    let results: Result<Vec<Option<Section>>> = file
        .sections()
        .par_iter()
        .map(|section| -> Result<Option<Section>> {
            let masked = mask_all_except(&data, section);
            let bytes = file.file_data_with(&masked)?;
            let still_detected = scanner.scan(&bytes, file.filename())?;
            Ok(still_detected.then(|| section.clone()))
        })
        .collect();
    Ok(results?.into_iter().flatten().collect())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    ZeroSection,
    Isolate,
}

/// Runs the attribution policy (spec §4.4):
/// 1. confirm the unmodified file is detected,
/// 2. run the chosen strategy,
/// 3. abort zero-section results with more than
///    [`MAX_ZERO_SECTION_CANDIDATES`] sections,
/// 4. optionally drop any section named `.text`.
///
/// Recoverable conditions (§7) are returned as `Err`: `NotDetected` when
/// the unmodified input does not trigger the scanner, `NoSections` when
/// the chosen strategy yields no candidates, `TooManySections` when
/// zero-section attribution finds more than three. Callers that want the
/// documented "empty result plus a log line" behavior (e.g. `analyzer::analyze`)
/// catch these and convert them; callers invoking attribution directly get
/// them as typed errors.
pub fn attribute(
    file: &dyn FileAdapter,
    scanner: &dyn Scanner,
    strategy: Strategy,
    ignore_text: bool,
) -> Result<Vec<Section>> {
    let original = file.data();
    let original_bytes = file.file_data_with(&original)?;
    if !scanner.scan(&original_bytes, file.filename())? {
        tracing::warn!(file = file.filename(), "input is not detected by the scanner");
        return Err(Error::NotDetected);
    }

    let mut sections = match strategy {
        Strategy::ZeroSection => {
            let found = find_detected_sections_zero(file, scanner)?;
            if found.len() > MAX_ZERO_SECTION_CANDIDATES {
                return Err(Error::TooManySections(found.len()));
            }
            found
        }
        Strategy::Isolate => find_detected_sections_isolate(file, scanner)?,
    };

    if ignore_text {
        sections.retain(|s| !s.name.contains(".text"));
    }

    if sections.is_empty() {
        tracing::warn!(file = file.filename(), "attribution produced no candidates");
        return Err(Error::NoSections);
    }

    Ok(sections)
}
