//! Orchestration entry point: confirm detection, attribute to sections,
//! reduce each detected section, optionally verify the combined result.

use crate::attribution::{attribute, Strategy};
use crate::data::Data;
use crate::error::{Error, Result};
use crate::outcome::{self, MatchInfo, Outcome, ScanInfo, SectionInfo};
use crate::reducer::{legacy_linear_scan, Match, Reducer, ScanSpeed};
use crate::reporter::Reporter;
use crate::scanner::Scanner;
use crate::section::{FileAdapter, Section};
use crate::verify;

#[derive(Debug, Clone)]
pub struct AnalyzeOptions {
    pub isolate: bool,
    pub remove_noise: bool,
    pub ignore_text: bool,
    pub verify: bool,
    pub new_algorithm: bool,
    pub scan_speed: ScanSpeed,
}

impl Default for AnalyzeOptions {
    fn default() -> Self {
        AnalyzeOptions {
            isolate: false,
            remove_noise: false,
            ignore_text: false,
            verify: true,
            new_algorithm: true,
            scan_speed: ScanSpeed::Normal,
        }
    }
}

/// The names of sections to hide before attribution when `remove_noise`
/// is set — mirrors the original `investigate`'s
/// `hide_section(pe, "Ressources")` / `hide_section(pe, "VersionInfo")`.
const NOISE_SECTION_NAMES: &[&str] = &["Ressources", "VersionInfo", ".rsrc"];

/// Nulls every section whose name matches [`NOISE_SECTION_NAMES`] in
/// `data`. Applied once, before the detection-confirm step, so noise
/// bytes never participate in confirmation, attribution, or reduction.
fn strip_noise_sections(sections: &[Section], data: &Data) -> Data {
    let mut stripped = data.clone();
    for section in sections {
        if NOISE_SECTION_NAMES.iter().any(|n| section.name.contains(n)) {
            stripped = stripped.fill(section.addr, section.size);
        }
    }
    stripped
}

/// Wraps a `FileAdapter` so every `data()` call returns a fixed,
/// precomputed logical view (the noise-stripped variant) instead of the
/// underlying adapter's own. Repacking, the filename, and the section
/// table are unaffected — masking never changes length or section
/// boundaries, so the wrapped adapter is a drop-in replacement for the
/// rest of the pipeline.
struct NoiseStrippedFile<'a> {
    inner: &'a dyn FileAdapter,
    data: Data,
}

impl<'a> FileAdapter for NoiseStrippedFile<'a> {
    fn data(&self) -> Data {
        self.data.clone()
    }

    fn file_data_with(&self, data: &Data) -> Result<Vec<u8>> {
        self.inner.file_data_with(data)
    }

    fn filename(&self) -> &str {
        self.inner.filename()
    }

    fn sections(&self) -> &[Section] {
        self.inner.sections()
    }
}

/// Runs the full pipeline: confirm detection, attribute to sections,
/// reduce each attributed section, and optionally verify the combined
/// matches. Returns an empty match list (not an error) for the
/// recoverable conditions named in spec §7: not detected, no candidate
/// sections, or too-many-sections under the zero-section strategy.
pub fn analyze(
    file: &dyn FileAdapter,
    scanner: &dyn Scanner,
    options: AnalyzeOptions,
) -> Result<(Outcome, Vec<Match>)> {
    analyze_with_reporter(file, scanner, options, Box::new(crate::reporter::NullReporter))
}

pub fn analyze_with_reporter<'a>(
    file: &'a dyn FileAdapter,
    scanner: &'a dyn Scanner,
    options: AnalyzeOptions,
    reporter_factory: Box<dyn Reporter + 'a>,
) -> Result<(Outcome, Vec<Match>)> {
    let base_data = file.data();
    let size = base_data.len();
    let mut outcome = Outcome::null(file.filename(), size);

    // Hide noise sections (Resources/VersionInfo) before anything else
    // touches the file: confirmation, attribution, and reduction all see
    // the stripped view, so noise bytes can never cause a spurious
    // detection, a spurious attribution candidate, or a wrong
    // TooManySections abort.
    let working_data = if options.remove_noise {
        strip_noise_sections(file.sections(), &base_data)
    } else {
        base_data
    };
    let working = NoiseStrippedFile {
        inner: file,
        data: working_data,
    };

    let strategy = if options.isolate {
        Strategy::Isolate
    } else {
        Strategy::ZeroSection
    };

    let sections = match attribute(&working, scanner, strategy, options.ignore_text) {
        Ok(sections) => sections,
        Err(Error::NotDetected) | Err(Error::NoSections) => {
            return Ok((outcome, Vec::new()));
        }
        Err(Error::TooManySections(n)) => {
            tracing::warn!(
                count = n,
                "more than 3 sections detected independently; try isolate strategy"
            );
            return Ok((outcome, Vec::new()));
        }
        Err(e) => return Err(e),
    };

    outcome.is_detected = true;
    outcome.scan_info = ScanInfo {
        scanner_name: String::new(),
        scan_speed: outcome::scan_speed_label(options.scan_speed).to_string(),
        strategy: Some(outcome::strategy_label(strategy).to_string()),
        chunks_tested: 0,
        matches_added: 0,
        sections: sections.iter().map(SectionInfo::from).collect(),
    };

    let mut all_matches: Vec<Match> = Vec::new();

    if options.new_algorithm {
        let mut reducer =
            Reducer::new(&working, scanner, options.scan_speed).with_reporter(reporter_factory);
        for section in &sections {
            tracing::info!(section = %section.name, "launching bisection on section");
            let matches = reducer.scan(section.addr, section.end())?;
            outcome.scan_info.chunks_tested += reducer.chunks_tested();
            outcome.scan_info.matches_added += reducer.matches_added();
            all_matches.extend(matches);
        }
    } else {
        for section in &sections {
            tracing::info!(section = %section.name, "launching legacy linear scan on section");
            let matches = legacy_linear_scan(&working, scanner, section.addr, section.end(), 32)?;
            all_matches.extend(matches);
        }
    }

    outcome.matches = all_matches.iter().map(MatchInfo::from).collect();

    if options.verify {
        let report = verify::verify(&working, scanner, &all_matches)?;
        outcome.is_verified = report.suppressed;
        if !report.suppressed {
            tracing::warn!("file still detected after masking all matches");
        }
    }

    Ok((outcome, all_matches))
}

/// Analyzes a raw, unstructured input: the whole file is treated as a
/// single section.
pub fn analyze_plain(
    file: &dyn FileAdapter,
    scanner: &dyn Scanner,
    options: AnalyzeOptions,
) -> Result<(Outcome, Vec<Match>)> {
    analyze(file, scanner, options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::NullScanner;
    use crate::section::RawAdapter;

    #[test]
    fn scenario_d_undetected_input_returns_empty_matches() {
        let file = RawAdapter::new("clean.bin", vec![0u8; 128]);
        let scanner = NullScanner::new(|_: &[u8], _: &str| false);
        let (outcome, matches) = analyze(&file, &scanner, AnalyzeOptions::default()).unwrap();
        assert!(matches.is_empty());
        assert!(!outcome.is_detected);
    }

    #[test]
    fn full_pipeline_detects_verifies_and_reports_match() {
        let mut bytes = vec![0u8; 512];
        bytes[200..209].copy_from_slice(b"MALICIOUS");
        let file = RawAdapter::new("full.bin", bytes);
        let scanner = NullScanner::new(|data: &[u8], _: &str| {
            data.windows(9).any(|w| w == b"MALICIOUS")
        });

        let (outcome, matches) = analyze(&file, &scanner, AnalyzeOptions::default()).unwrap();
        assert!(!matches.is_empty());
        assert!(outcome.is_detected);
        assert!(outcome.is_verified);
    }

    #[test]
    fn legacy_algorithm_path_also_finds_a_match() {
        let mut bytes = vec![0u8; 256];
        bytes[64..73].copy_from_slice(b"MALICIOUS");
        let file = RawAdapter::new("legacy.bin", bytes);
        let scanner = NullScanner::new(|data: &[u8], _: &str| {
            data.windows(9).any(|w| w == b"MALICIOUS")
        });

        let mut options = AnalyzeOptions::default();
        options.new_algorithm = false;
        let (_, matches) = analyze(&file, &scanner, options).unwrap();
        assert!(!matches.is_empty());
    }

    struct TwoNamedSectionsFile {
        data: Data,
        filename: String,
        sections: Vec<Section>,
    }

    impl FileAdapter for TwoNamedSectionsFile {
        fn data(&self) -> Data {
            self.data.clone()
        }
        fn file_data_with(&self, data: &Data) -> Result<Vec<u8>> {
            Ok(data.to_bytes())
        }
        fn filename(&self) -> &str {
            &self.filename
        }
        fn sections(&self) -> &[Section] {
            &self.sections
        }
    }

    #[test]
    fn remove_noise_strips_the_noise_section_before_confirmation() {
        // The only signature bytes live inside the "VersionInfo" section.
        // With remove_noise, that section is nulled before the initial
        // detection confirm, so the file reads as clean overall.
        let mut bytes = vec![0u8; 200];
        bytes[150..159].copy_from_slice(b"MALICIOUS");
        let file = TwoNamedSectionsFile {
            data: Data::from_bytes(bytes),
            filename: "noise.bin".to_string(),
            sections: vec![
                Section::new("main", 0, 100),
                Section::new("VersionInfo", 100, 100),
            ],
        };
        let scanner = NullScanner::new(|data: &[u8], _: &str| {
            data.windows(9).any(|w| w == b"MALICIOUS")
        });

        let mut options = AnalyzeOptions::default();
        options.remove_noise = true;
        let (outcome, matches) = analyze(&file, &scanner, options).unwrap();
        assert!(matches.is_empty());
        assert!(!outcome.is_detected);
    }

    #[test]
    fn without_remove_noise_the_signature_in_the_noise_section_is_still_found() {
        let mut bytes = vec![0u8; 200];
        bytes[150..159].copy_from_slice(b"MALICIOUS");
        let file = TwoNamedSectionsFile {
            data: Data::from_bytes(bytes),
            filename: "noise2.bin".to_string(),
            sections: vec![
                Section::new("main", 0, 100),
                Section::new("VersionInfo", 100, 100),
            ],
        };
        let scanner = NullScanner::new(|data: &[u8], _: &str| {
            data.windows(9).any(|w| w == b"MALICIOUS")
        });

        let (outcome, matches) =
            analyze(&file, &scanner, AnalyzeOptions::default()).unwrap();
        assert!(!matches.is_empty());
        assert!(outcome.is_detected);
    }

    #[test]
    fn scan_info_counters_reflect_reducer_work() {
        let mut bytes = vec![0u8; 512];
        bytes[200..209].copy_from_slice(b"MALICIOUS");
        let file = RawAdapter::new("counters.bin", bytes);
        let scanner = NullScanner::new(|data: &[u8], _: &str| {
            data.windows(9).any(|w| w == b"MALICIOUS")
        });

        let (outcome, _) = analyze(&file, &scanner, AnalyzeOptions::default()).unwrap();
        assert!(outcome.scan_info.chunks_tested > 0);
        assert!(outcome.scan_info.matches_added > 0);
    }
}
