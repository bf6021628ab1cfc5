//! # Result Comparison
//!
//! Decides which expected fixtures the engine failed to report.
//!
//! Two detection modes exist:
//! - `Substring` (default): a fixture counts as detected when its exact file
//!   name appears anywhere in the engine's stdout.
//! - `Records`: stdout lines that parse as JSON objects with a string `file`
//!   field are treated as processed-file records; everything else is ignored.
//!   This avoids false positives from file names mentioned in log noise.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::engine::CapturedResult;
use crate::target::TargetExtension;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionMode {
    #[default]
    Substring,
    Records,
}

/// Expected extensions whose fixture was not observed, in target order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Discrepancy {
    missing: Vec<String>,
}

impl Discrepancy {
    pub fn passed(&self) -> bool {
        self.missing.is_empty()
    }

    pub fn extensions(&self) -> &[String] {
        &self.missing
    }

    pub fn contains(&self, extension: &str) -> bool {
        self.missing.iter().any(|m| m == extension)
    }

    pub fn len(&self) -> usize {
        self.missing.len()
    }

    pub fn is_empty(&self) -> bool {
        self.missing.is_empty()
    }
}

impl fmt::Display for Discrepancy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.missing.join(", "))
    }
}

#[derive(Deserialize)]
struct EngineRecord {
    file: String,
}

/// Precomputed view of stdout for one detection mode.
struct Observed<'a> {
    stdout: &'a str,
    mode: DetectionMode,
    records: Vec<String>,
}

impl<'a> Observed<'a> {
    fn new(stdout: &'a str, mode: DetectionMode) -> Self {
        let records = match mode {
            DetectionMode::Substring => Vec::new(),
            DetectionMode::Records => stdout
                .lines()
                .filter_map(|line| serde_json::from_str::<EngineRecord>(line.trim()).ok())
                .map(|record| record.file)
                .collect(),
        };
        Self {
            stdout,
            mode,
            records,
        }
    }

    fn contains(&self, name: &str) -> bool {
        match self.mode {
            DetectionMode::Substring => self.stdout.contains(name),
            DetectionMode::Records => self.records.iter().any(|file| record_names(file, name)),
        }
    }
}

/// A record names a fixture when it is the bare file name or a path ending in it.
fn record_names(file: &str, name: &str) -> bool {
    match file.strip_suffix(name) {
        Some("") => true,
        Some(prefix) => prefix.ends_with('/') || prefix.ends_with('\\'),
        None => false,
    }
}

/// Compute the expected-but-unobserved extensions.
///
/// Negative controls are skipped entirely; duplicate targets are reported
/// at most once.
pub fn compare(
    targets: &[TargetExtension],
    captured: &CapturedResult,
    mode: DetectionMode,
) -> Discrepancy {
    let observed = Observed::new(&captured.stdout, mode);
    let mut missing: Vec<String> = Vec::new();
    for target in targets.iter().filter(|t| !t.excluded_from_expectation) {
        if observed.contains(&target.fixture_name()) {
            continue;
        }
        if !missing.contains(&target.extension) {
            missing.push(target.extension.clone());
        }
    }
    Discrepancy { missing }
}

/// Negative-control extensions whose fixture name showed up in stdout anyway.
///
/// Reported for diagnosis only; it never turns a control into a detection.
pub fn detected_controls(
    targets: &[TargetExtension],
    captured: &CapturedResult,
    mode: DetectionMode,
) -> Vec<String> {
    let observed = Observed::new(&captured.stdout, mode);
    targets
        .iter()
        .filter(|t| t.excluded_from_expectation)
        .filter(|t| observed.contains(&t.fixture_name()))
        .map(|t| t.extension.clone())
        .collect()
}
