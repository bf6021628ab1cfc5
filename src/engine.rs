//! # Engine Invocation
//!
//! Runs the external media-classification engine as a black-box subprocess.
//!
//! The engine is launched as
//! `<program> <pre_args…> <subcommand> --dir <path> <extra_flags…>` and waited
//! on with a bounded timeout. Stdout and stderr are redirected to anonymous
//! temporary files rather than pipes, so a chatty engine cannot stall on a
//! full pipe buffer while the harness polls for its exit.

use std::ffi::OsString;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, warn};

use crate::config::EngineConfig;

pub const DEFAULT_SUBCOMMAND: &str = "batch_scan";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(600);
const POLL_INTERVAL: Duration = Duration::from_millis(25);

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to spawn engine {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("io error while capturing engine output: {0}")]
    Io(#[from] std::io::Error),
    #[error("engine exited with {}", describe_exit(.code))]
    Invocation {
        code: Option<i32>,
        stdout: String,
        stderr: String,
    },
    #[error("engine did not finish within {timeout:?}")]
    Timeout {
        timeout: Duration,
        stdout: String,
        stderr: String,
    },
}

impl EngineError {
    /// Captured (stdout, stderr) when the engine ran far enough to produce them.
    pub fn captured_streams(&self) -> Option<(&str, &str)> {
        match self {
            EngineError::Invocation { stdout, stderr, .. }
            | EngineError::Timeout { stdout, stderr, .. } => Some((stdout, stderr)),
            EngineError::Spawn { .. } | EngineError::Io(_) => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, EngineError::Timeout { .. })
    }
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {code}"),
        None => "no status (terminated by signal)".to_string(),
    }
}

/// Immutable description of one engine launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanInvocation {
    program: OsString,
    pre_args: Vec<OsString>,
    subcommand: String,
    dir: PathBuf,
    extra_flags: Vec<OsString>,
    working_dir: Option<PathBuf>,
    timeout: Duration,
}

impl ScanInvocation {
    pub fn new(program: impl Into<OsString>, dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            pre_args: Vec::new(),
            subcommand: DEFAULT_SUBCOMMAND.to_string(),
            dir: dir.into(),
            extra_flags: vec![OsString::from("--no-vad")],
            working_dir: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn from_config(cfg: &EngineConfig, dir: &Path) -> Self {
        let mut invocation = Self::new(&cfg.program, dir)
            .with_pre_args(&cfg.pre_args)
            .with_subcommand(&cfg.subcommand)
            .with_extra_flags(&cfg.extra_flags)
            .with_timeout(Duration::from_secs(cfg.timeout_secs));
        if let Some(working_dir) = &cfg.working_dir {
            invocation = invocation.with_working_dir(working_dir);
        }
        invocation
    }

    pub fn with_pre_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.pre_args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_subcommand(mut self, subcommand: impl Into<String>) -> Self {
        self.subcommand = subcommand.into();
        self
    }

    pub fn with_extra_flags<I, S>(mut self, flags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.extra_flags = flags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn working_dir(&self) -> Option<&Path> {
        self.working_dir.as_deref()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Full argument vector, excluding the program itself.
    pub fn args(&self) -> Vec<OsString> {
        let mut args = self.pre_args.clone();
        if !self.subcommand.is_empty() {
            args.push(OsString::from(&self.subcommand));
        }
        args.push(OsString::from("--dir"));
        args.push(self.dir.clone().into_os_string());
        args.extend(self.extra_flags.iter().cloned());
        args
    }

    /// Shell-ish rendering for progress output and logs.
    pub fn command_line(&self) -> String {
        std::iter::once(&self.program)
            .chain(self.args().iter())
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Output of an engine run that exited successfully.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedResult {
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub elapsed: Duration,
}

/// Something that can run a scan invocation to completion.
pub trait ScanEngine {
    fn scan(&self, invocation: &ScanInvocation) -> Result<CapturedResult, EngineError>;
}

/// Runs the engine as a real child process.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessEngine;

impl ScanEngine for ProcessEngine {
    fn scan(&self, invocation: &ScanInvocation) -> Result<CapturedResult, EngineError> {
        run(invocation)
    }
}

/// Launch the engine, wait up to the invocation timeout, and capture output.
///
/// A single attempt is authoritative; there is no retry.
pub fn run(invocation: &ScanInvocation) -> Result<CapturedResult, EngineError> {
    let mut stdout_file = tempfile::tempfile()?;
    let mut stderr_file = tempfile::tempfile()?;

    let mut command = Command::new(&invocation.program);
    command
        .args(invocation.args())
        .stdin(Stdio::null())
        .stdout(Stdio::from(stdout_file.try_clone()?))
        .stderr(Stdio::from(stderr_file.try_clone()?));
    if let Some(dir) = &invocation.working_dir {
        command.current_dir(dir);
    }

    debug!("spawning engine: {}", invocation.command_line());
    let started = Instant::now();
    let mut child = command.spawn().map_err(|source| EngineError::Spawn {
        program: invocation.program.to_string_lossy().into_owned(),
        source,
    })?;
    drop(command);

    let status = loop {
        let polled = child.try_wait();
        if let Some(status) = reap_on_error(&mut child, polled)? {
            break Some(status);
        }
        if started.elapsed() >= invocation.timeout {
            warn!(
                "engine exceeded timeout of {:?}; killing pid {}",
                invocation.timeout,
                child.id()
            );
            let _ = child.kill();
            child.wait()?;
            break None;
        }
        thread::sleep(POLL_INTERVAL);
    };
    let elapsed = started.elapsed();

    let stdout = read_capture(&mut stdout_file)?;
    let stderr = read_capture(&mut stderr_file)?;

    match status {
        None => Err(EngineError::Timeout {
            timeout: invocation.timeout,
            stdout,
            stderr,
        }),
        Some(status) if status.success() => {
            debug!("engine finished in {:?}", elapsed);
            Ok(CapturedResult {
                exit_code: status.code(),
                stdout,
                stderr,
                elapsed,
            })
        }
        Some(status) => Err(EngineError::Invocation {
            code: status.code(),
            stdout,
            stderr,
        }),
    }
}

/// Kill and reap the child before surfacing a polling error.
fn reap_on_error<T>(child: &mut Child, result: std::io::Result<T>) -> Result<T, EngineError> {
    result.map_err(|err| {
        warn!("lost track of engine pid {}: {err}; killing it", child.id());
        let _ = child.kill();
        let _ = child.wait();
        EngineError::Io(err)
    })
}

fn read_capture(file: &mut File) -> std::io::Result<String> {
    file.seek(SeekFrom::Start(0))?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
