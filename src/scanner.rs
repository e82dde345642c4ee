//! The scanner oracle: a single boolean "does this trigger detection?"
//! operation, plus a few concrete transports so the crate is runnable
//! without wiring up a real AV engine.

use std::io::Write as _;
use std::process::Command;
use std::time::Duration;

use crate::error::{Error, Result};

/// `scan(data, filename) -> bool`, true iff the scanner detects the blob.
/// Must be deterministic for identical inputs within a session; the core
/// does not retry internally on transport failure (§7) — that is the
/// implementation's own responsibility.
pub trait Scanner {
    fn scan(&self, data: &[u8], filename: &str) -> Result<bool>;
}

/// A scanner driven by a predicate closure. Used throughout tests in
/// place of a real AV engine.
pub struct NullScanner<F: Fn(&[u8], &str) -> bool> {
    predicate: F,
}

impl<F: Fn(&[u8], &str) -> bool> NullScanner<F> {
    pub fn new(predicate: F) -> Self {
        NullScanner { predicate }
    }
}

impl<F: Fn(&[u8], &str) -> bool> Scanner for NullScanner<F> {
    fn scan(&self, data: &[u8], filename: &str) -> Result<bool> {
        Ok((self.predicate)(data, filename))
    }
}

/// Scans by checking that a fixed set of byte ranges still hold their
/// expected reference content. Detection survives exactly as long as
/// none of the watched ranges have been masked away.
pub struct FixtureScanner {
    detections: Vec<(usize, Vec<u8>)>,
}

impl FixtureScanner {
    pub fn new(detections: Vec<(usize, Vec<u8>)>) -> Self {
        FixtureScanner { detections }
    }
}

impl Scanner for FixtureScanner {
    fn scan(&self, data: &[u8], _filename: &str) -> Result<bool> {
        for (pos, expected) in &self.detections {
            let end = pos + expected.len();
            if data.len() < end || &data[*pos..end] != expected.as_slice() {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

/// POSTs bytes to a remote scanning endpoint (e.g. a local AV REST
/// bridge). Performs a small bounded retry as the transport's own
/// resilience (not the core's) before surfacing
/// `Error::ScannerTransportFailure`.
pub struct HttpScanner {
    endpoint: String,
    max_retries: u32,
    retry_delay: Duration,
}

impl HttpScanner {
    pub fn new(endpoint: impl Into<String>) -> Self {
        HttpScanner {
            endpoint: endpoint.into(),
            max_retries: 3,
            retry_delay: Duration::from_millis(200),
        }
    }

    pub fn with_retries(mut self, max_retries: u32, retry_delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.retry_delay = retry_delay;
        self
    }
}

impl Scanner for HttpScanner {
    fn scan(&self, data: &[u8], filename: &str) -> Result<bool> {
        let mut last_err = String::new();
        for attempt in 0..=self.max_retries {
            let result = ureq::post(&self.endpoint)
                .set("X-Filename", filename)
                .set("Content-Type", "application/octet-stream")
                .send_bytes(data);
            match result {
                Ok(response) => {
                    let detected = response.status() == 200;
                    return Ok(detected);
                }
                Err(e) => {
                    last_err = e.to_string();
                    tracing::warn!(attempt, error = %last_err, "scanner transport attempt failed");
                    if attempt < self.max_retries {
                        std::thread::sleep(self.retry_delay);
                    }
                }
            }
        }
        Err(Error::ScannerTransportFailure(last_err))
    }
}

/// Invokes a local scanner binary (e.g. `clamscan`) as a subprocess over
/// a temp file. `success_means_detected` flips the exit-code convention
/// for scanners that return 0 on a clean file.
pub struct ProcessScanner {
    command: String,
    args: Vec<String>,
    success_means_detected: bool,
}

impl ProcessScanner {
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        ProcessScanner {
            command: command.into(),
            args,
            success_means_detected: false,
        }
    }

    pub fn success_means_detected(mut self, value: bool) -> Self {
        self.success_means_detected = value;
        self
    }
}

impl Scanner for ProcessScanner {
    fn scan(&self, data: &[u8], filename: &str) -> Result<bool> {
        let mut tmp = tempfile::Builder::new()
            .suffix(&format!("-{filename}"))
            .tempfile()
            .map_err(|e| Error::ScannerTransportFailure(e.to_string()))?;
        tmp.write_all(data)
            .map_err(|e| Error::ScannerTransportFailure(e.to_string()))?;
        tmp.flush()
            .map_err(|e| Error::ScannerTransportFailure(e.to_string()))?;

        let output = Command::new(&self.command)
            .args(&self.args)
            .arg(tmp.path())
            .output()
            .map_err(|e| Error::ScannerTransportFailure(e.to_string()))?;

        let succeeded = output.status.success();
        Ok(succeeded == self.success_means_detected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_scanner_runs_predicate() {
        let scanner = NullScanner::new(|data: &[u8], _: &str| data.contains(&0xAA));
        assert!(scanner.scan(&[1, 2, 0xAA], "f").unwrap());
        assert!(!scanner.scan(&[1, 2, 3], "f").unwrap());
    }

    #[test]
    fn fixture_scanner_detects_while_reference_bytes_intact() {
        let scanner = FixtureScanner::new(vec![(2, vec![b'X', b'Y']), (10, vec![b'Z'])]);
        let mut data = vec![0u8; 11];
        data[2] = b'X';
        data[3] = b'Y';
        data[10] = b'Z';
        assert!(scanner.scan(&data, "f").unwrap());

        data[2] = 0; // mask the first reference range
        assert!(!scanner.scan(&data, "f").unwrap());
    }
}
