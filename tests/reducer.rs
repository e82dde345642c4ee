//! Integration-level coverage of spec scenarios that cross module
//! boundaries (attribution + analyze), complementing the scenario tests
//! colocated with `reducer.rs`/`attribution.rs`.

use avred::analyzer::{analyze, AnalyzeOptions};
use avred::data::Data;
use avred::error::Error;
use avred::scanner::NullScanner;
use avred::section::{FileAdapter, Section};

struct FiveSectionFile {
    data: Data,
    sections: Vec<Section>,
}

impl FileAdapter for FiveSectionFile {
    fn data(&self) -> Data {
        self.data.clone()
    }
    fn file_data_with(&self, data: &Data) -> Result<Vec<u8>, Error> {
        Ok(data.to_bytes())
    }
    fn filename(&self) -> &str {
        "five_sections.bin"
    }
    fn sections(&self) -> &[Section] {
        &self.sections
    }
}

#[test]
fn scenario_e_too_many_sections_yields_empty_matches_with_diagnostic() {
    // Every byte is part of the signature: nulling any single section
    // suppresses detection, so zero-section attribution reports all 5.
    let bytes = vec![0xABu8; 100];
    let file = FiveSectionFile {
        data: Data::from_bytes(bytes),
        sections: (0..5)
            .map(|i| Section::new(format!("sec{i}"), i * 20, 20))
            .collect(),
    };
    let scanner = NullScanner::new(|data: &[u8], _: &str| data.iter().all(|&b| b == 0xAB));

    let (outcome, matches) = analyze(&file, &scanner, AnalyzeOptions::default()).unwrap();

    assert!(matches.is_empty());
    assert!(!outcome.is_verified);
}

#[test]
fn outcome_persists_to_and_reloads_from_json() {
    let mut bytes = vec![0u8; 256];
    bytes[64..73].copy_from_slice(b"MALICIOUS");
    let file = avred::section::RawAdapter::new("persist.bin", bytes);
    let scanner = NullScanner::new(|data: &[u8], _: &str| {
        data.windows(9).any(|w| w == b"MALICIOUS")
    });

    let (outcome, matches) = analyze(&file, &scanner, AnalyzeOptions::default()).unwrap();
    assert!(!matches.is_empty());

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("persist.bin");
    outcome.save_to_file(&path).unwrap();

    let saved_path = format!("{}.outcome.json", path.display());
    let contents = std::fs::read_to_string(&saved_path).unwrap();
    let reloaded: serde_json::Value = serde_json::from_str(&contents).unwrap();
    assert_eq!(reloaded["file_info"]["name"], "persist.bin");
}
