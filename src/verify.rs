//! Verification driver: a sanity check, not part of match computation.
//!
//! Masks matches into a `Data` clone and checks non-detection. Returns
//! success on the first prefix of matches whose masking already
//! suppresses detection, rather than only after masking all of them —
//! preserved from the original implementation, which applies matches one
//! at a time and returns as soon as the scanner stops detecting. This
//! implies matches are meant to be tried in return order (presumed
//! importance order); see DESIGN.md.

use crate::error::Result;
use crate::reducer::Match;
use crate::scanner::Scanner;
use crate::section::FileAdapter;

pub struct VerificationReport {
    pub suppressed: bool,
    /// Number of matches that had been masked in when detection first
    /// stopped (or all of them, if verification failed).
    pub matches_applied: usize,
}

pub fn verify(file: &dyn FileAdapter, scanner: &dyn Scanner, matches: &[Match]) -> Result<VerificationReport> {
    let mut data = file.data();
    for (i, m) in matches.iter().enumerate() {
        data = data.fill(m.begin, m.len());
        let bytes = file.file_data_with(&data)?;
        let still_detected = scanner.scan(&bytes, file.filename())?;
        tracing::info!(begin = m.begin, end = m.end, still_detected, "verification patch applied");
        if !still_detected {
            return Ok(VerificationReport {
                suppressed: true,
                matches_applied: i + 1,
            });
        }
    }
    Ok(VerificationReport {
        suppressed: false,
        matches_applied: matches.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::NullScanner;
    use crate::section::RawAdapter;

    #[test]
    fn verify_succeeds_once_masking_suppresses_detection() {
        let mut bytes = vec![0u8; 64];
        bytes[10..19].copy_from_slice(b"MALICIOUS");
        let file = RawAdapter::new("v.bin", bytes);
        let scanner = NullScanner::new(|data: &[u8], _: &str| {
            data.windows(9).any(|w| w == b"MALICIOUS")
        });

        let matches = vec![crate::reducer::Match {
            begin: 10,
            end: 19,
            index: 0,
            iteration: 0,
        }];
        let report = verify(&file, &scanner, &matches).unwrap();
        assert!(report.suppressed);
        assert_eq!(report.matches_applied, 1);
    }

    #[test]
    fn verify_stops_at_first_successful_prefix() {
        let mut bytes = vec![0u8; 64];
        bytes[0..4].copy_from_slice(b"SIGA");
        bytes[40..44].copy_from_slice(b"SIGB");
        let file = RawAdapter::new("v2.bin", bytes);
        // Detection requires SIGA OR SIGB present - masking either is enough.
        let scanner = NullScanner::new(|data: &[u8], _: &str| {
            data.windows(4).any(|w| w == b"SIGA") || data.windows(4).any(|w| w == b"SIGB")
        });
        let matches = vec![
            crate::reducer::Match { begin: 0, end: 4, index: 0, iteration: 0 },
            crate::reducer::Match { begin: 40, end: 44, index: 1, iteration: 0 },
        ];
        let report = verify(&file, &scanner, &matches).unwrap();
        assert!(report.suppressed);
        assert_eq!(report.matches_applied, 1);
    }

    #[test]
    fn verify_fails_when_detection_survives_all_matches() {
        let bytes = vec![1u8; 16];
        let file = RawAdapter::new("v3.bin", bytes);
        let scanner = NullScanner::new(|_: &[u8], _: &str| true);
        let matches = vec![crate::reducer::Match { begin: 0, end: 4, index: 0, iteration: 0 }];
        let report = verify(&file, &scanner, &matches).unwrap();
        assert!(!report.suppressed);
    }
}
