//! Persistable summary of one `analyze()` run: file info, matches, and
//! scan metadata. Format is not part of the core contract (spec §6);
//! this crate picks JSON via `serde`.

use serde::{Deserialize, Serialize};

use crate::attribution::Strategy;
use crate::error::Result;
use crate::reducer::{Match, ScanSpeed};
use crate::section::Section;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileInfo {
    pub name: String,
    pub size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanInfo {
    pub scanner_name: String,
    pub scan_speed: String,
    pub strategy: Option<String>,
    pub chunks_tested: usize,
    pub matches_added: usize,
    pub sections: Vec<SectionInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionInfo {
    pub name: String,
    pub addr: usize,
    pub size: usize,
}

impl From<&Section> for SectionInfo {
    fn from(s: &Section) -> Self {
        SectionInfo {
            name: s.name.clone(),
            addr: s.addr,
            size: s.size,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchInfo {
    pub begin: usize,
    pub end: usize,
    pub index: usize,
    pub iteration: usize,
}

impl From<&Match> for MatchInfo {
    fn from(m: &Match) -> Self {
        MatchInfo {
            begin: m.begin,
            end: m.end,
            index: m.index,
            iteration: m.iteration,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Outcome {
    pub file_info: FileInfo,
    pub matches: Vec<MatchInfo>,
    pub scan_info: ScanInfo,
    pub is_detected: bool,
    pub is_verified: bool,
}

impl Outcome {
    pub fn null(filename: impl Into<String>, size: usize) -> Self {
        Outcome {
            file_info: FileInfo {
                name: filename.into(),
                size,
            },
            matches: Vec::new(),
            scan_info: ScanInfo {
                scanner_name: String::new(),
                scan_speed: String::new(),
                strategy: None,
                chunks_tested: 0,
                matches_added: 0,
                sections: Vec::new(),
            },
            is_detected: false,
            is_verified: false,
        }
    }

    pub fn save_to_file(&self, path: impl AsRef<std::path::Path>) -> Result<()> {
        let path = path.as_ref();
        let filename = format!("{}.outcome.json", path.display());
        tracing::info!(filename, "saving results");
        let file = std::fs::File::create(&filename)?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }
}

pub fn scan_speed_label(speed: ScanSpeed) -> &'static str {
    match speed {
        ScanSpeed::Fast => "fast",
        ScanSpeed::Normal => "normal",
        ScanSpeed::Slow => "slow",
        ScanSpeed::Complete => "complete",
    }
}

pub fn strategy_label(strategy: Strategy) -> &'static str {
    match strategy {
        Strategy::ZeroSection => "zero-section",
        Strategy::Isolate => "isolate",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_round_trips_through_json() {
        let mut outcome = Outcome::null("test.bin", 1024);
        outcome.matches.push(MatchInfo {
            begin: 10,
            end: 20,
            index: 0,
            iteration: 0,
        });
        let json = serde_json::to_string(&outcome).unwrap();
        let back: Outcome = serde_json::from_str(&json).unwrap();
        assert_eq!(back.matches.len(), 1);
        assert_eq!(back.file_info.name, "test.bin");
    }
}
