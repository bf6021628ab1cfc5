//! # Verification Harness
//!
//! Sequences one verification run:
//!
//! ```text
//! INIT -> FIXTURES_READY -> INVOKED -> COMPARED -> {PASS, FAIL} -> CLEANED_UP
//! ```
//!
//! The fixture directory is removed on every path out of [`run_verification`],
//! including engine failures and errors while writing the narrative.

use std::io::Write;
use std::path::PathBuf;

use thiserror::Error;
use tracing::{error, info, warn};

use crate::compare::{self, DetectionMode, Discrepancy};
use crate::config::{EngineConfig, VerifyConfig};
use crate::engine::{EngineError, ScanEngine, ScanInvocation};
use crate::fixture::{self, FixtureDir, FixtureError};
use crate::target::TargetExtension;

/// Process exit codes for `verify-extensions`.
pub mod codes {
    /// Every expected extension was detected.
    pub const SUCCESS: u8 = 0;
    /// One or more expected extensions were not detected.
    pub const DISCREPANCY: u8 = 1;
    /// The engine could not be run or exited non-zero.
    pub const ENGINE_FAILURE: u8 = 2;
    /// The engine did not finish within its timeout.
    pub const ENGINE_TIMEOUT: u8 = 3;
    /// Configuration or fixture setup failed.
    pub const SETUP_ERROR: u8 = 4;
}

#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("fixture error: {0}")]
    Fixture(#[from] FixtureError),
    #[error("output error: {0}")]
    Output(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HarnessState {
    Init,
    FixturesReady,
    Invoked,
    Compared,
    Pass,
    Fail,
    CleanedUp,
}

/// Outcome of one verification run.
#[derive(Debug)]
pub enum Verdict {
    Pass,
    Fail(Discrepancy),
    EngineFailed(EngineError),
}

impl Verdict {
    pub fn passed(&self) -> bool {
        matches!(self, Verdict::Pass)
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            Verdict::Pass => codes::SUCCESS,
            Verdict::Fail(_) => codes::DISCREPANCY,
            Verdict::EngineFailed(err) if err.is_timeout() => codes::ENGINE_TIMEOUT,
            Verdict::EngineFailed(_) => codes::ENGINE_FAILURE,
        }
    }
}

/// Everything a run needs, resolved from configuration.
#[derive(Debug, Clone)]
pub struct VerifyPlan {
    pub fixture_dir: PathBuf,
    pub targets: Vec<TargetExtension>,
    pub detection: DetectionMode,
    pub engine: EngineConfig,
}

impl VerifyPlan {
    pub fn from_config(cfg: &VerifyConfig) -> Self {
        Self {
            fixture_dir: cfg.fixture_dir.clone(),
            targets: cfg.targets.clone(),
            detection: cfg.detection,
            engine: cfg.engine.clone(),
        }
    }
}

fn enter(state: HarnessState) {
    info!(state = ?state, "harness state");
}

/// Run one verification, writing the human-readable narrative to `out`.
///
/// Engine failures become [`Verdict::EngineFailed`]; only fixture and output
/// errors are returned as `Err`.
pub fn run_verification<E, W>(
    plan: &VerifyPlan,
    engine: &E,
    out: &mut W,
) -> Result<Verdict, HarnessError>
where
    E: ScanEngine + ?Sized,
    W: Write,
{
    enter(HarnessState::Init);
    let extensions: Vec<&str> = plan.targets.iter().map(|t| t.extension.as_str()).collect();
    let fixtures = fixture::prepare(&plan.fixture_dir, &extensions)?;
    enter(HarnessState::FixturesReady);

    let outcome = invoke_and_compare(plan, engine, &fixtures, &extensions, out);

    let cleanup = fixtures.cleanup();
    enter(HarnessState::CleanedUp);
    if let Err(err) = &cleanup {
        error!("fixture cleanup failed: {err}");
    }

    let verdict = outcome?;
    cleanup?;
    Ok(verdict)
}

fn invoke_and_compare<E, W>(
    plan: &VerifyPlan,
    engine: &E,
    fixtures: &FixtureDir,
    extensions: &[&str],
    out: &mut W,
) -> Result<Verdict, HarnessError>
where
    E: ScanEngine + ?Sized,
    W: Write,
{
    writeln!(
        out,
        "Created test files in {} with extensions: [{}]",
        fixtures.path().display(),
        extensions.join(", ")
    )?;

    let invocation = ScanInvocation::from_config(&plan.engine, fixtures.path());
    writeln!(out, "\nRunning scan: {}", invocation.command_line())?;

    let captured = match engine.scan(&invocation) {
        Ok(captured) => captured,
        Err(err) => {
            enter(HarnessState::Invoked);
            warn!("engine invocation failed: {err}");
            writeln!(out, "Error running scan: {err}")?;
            if let Some((stdout, stderr)) = err.captured_streams() {
                writeln!(out, "{stdout}")?;
                writeln!(out, "{stderr}")?;
            }
            return Ok(Verdict::EngineFailed(err));
        }
    };
    enter(HarnessState::Invoked);
    writeln!(out, "{}", captured.stdout)?;

    let discrepancy = compare::compare(&plan.targets, &captured, plan.detection);
    let leaked = compare::detected_controls(&plan.targets, &captured, plan.detection);
    enter(HarnessState::Compared);
    match serde_json::to_string(&discrepancy) {
        Ok(json) => info!(discrepancy = %json, "comparison result"),
        Err(err) => warn!("failed to serialize comparison result: {err}"),
    }
    if !leaked.is_empty() {
        warn!("engine reported negative-control fixtures: {}", leaked.join(", "));
        writeln!(
            out,
            "WARNING: negative-control extensions appeared in engine output: [{}]",
            leaked.join(", ")
        )?;
    }

    if discrepancy.passed() {
        enter(HarnessState::Pass);
        writeln!(out, "\nSUCCESS: All expected extensions were detected!")?;
        Ok(Verdict::Pass)
    } else {
        enter(HarnessState::Fail);
        writeln!(
            out,
            "\nFAILURE: The following extensions were NOT detected: {discrepancy}"
        )?;
        Ok(Verdict::Fail(discrepancy))
    }
}
