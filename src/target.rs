//! Target extensions and the fixture names derived from them.

use serde::Deserialize;

/// Stem shared by every fixture file; the extension is appended verbatim.
pub const FIXTURE_STEM: &str = "test";

/// An extension the harness materializes as a fixture.
///
/// Targets flagged `excluded_from_expectation` are negative controls: they are
/// written to disk like any other fixture, but the engine is never expected to
/// report them.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TargetExtension {
    pub extension: String,
    #[serde(default)]
    pub excluded_from_expectation: bool,
}

impl TargetExtension {
    pub fn expected(extension: impl Into<String>) -> Self {
        Self {
            extension: extension.into(),
            excluded_from_expectation: false,
        }
    }

    pub fn control(extension: impl Into<String>) -> Self {
        Self {
            extension: extension.into(),
            excluded_from_expectation: true,
        }
    }

    pub fn fixture_name(&self) -> String {
        fixture_file_name(&self.extension)
    }
}

/// `.mp3` -> `test.mp3`
pub fn fixture_file_name(extension: &str) -> String {
    format!("{FIXTURE_STEM}{extension}")
}

/// Lower-case an extension and make sure it carries its leading dot.
///
/// An empty input stays empty; it stands for "no extension".
pub fn normalize_extension(raw: &str) -> String {
    let trimmed = raw.trim().to_lowercase();
    if trimmed.is_empty() || trimmed.starts_with('.') {
        trimmed
    } else {
        format!(".{trimmed}")
    }
}
