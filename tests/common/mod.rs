//! Shared helpers for the integration tests.
//!
//! The external engine is replaced by a `sh -c` script that receives the
//! engine argument contract as positional parameters: `$1` is the
//! subcommand, `$2` is `--dir`, `$3` is the fixture directory.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use extcheck::config::EngineConfig;
use extcheck::harness::VerifyPlan;

/// Engine that lists the fixture directory but never reports `.txt` files.
pub const LISTING_ENGINE: &str = "ls \"$3\" | grep -v txt";

pub fn sh_engine(script: &str, timeout_secs: u64) -> EngineConfig {
    EngineConfig {
        program: "sh".to_string(),
        pre_args: vec!["-c".to_string(), script.to_string(), "engine".to_string()],
        subcommand: "batch_scan".to_string(),
        extra_flags: vec!["--no-vad".to_string()],
        timeout_secs,
        working_dir: None,
    }
}

/// Default targets and detection with the fixture dir and engine swapped out.
pub fn plan(fixture_dir: PathBuf, engine: EngineConfig) -> VerifyPlan {
    let loaded = extcheck::config::load_config(None).expect("config");
    let mut plan = VerifyPlan::from_config(&loaded.config.verify);
    plan.fixture_dir = fixture_dir;
    plan.engine = engine;
    plan
}

/// YAML config for the binaries, using a `sh` engine script.
pub fn write_config(dir: &Path, fixture_dir: &Path, script: &str) -> PathBuf {
    write_config_in(dir, fixture_dir, script, None)
}

/// Like [`write_config`], but runs the engine from `working_dir` when given.
pub fn write_config_in(
    dir: &Path,
    fixture_dir: &Path,
    script: &str,
    working_dir: Option<&Path>,
) -> PathBuf {
    let path = dir.join("extcheck.yml");
    let mut yaml = format!(
        "supported_extensions: [.mp4, .mkv, .wav]\n\
         verify:\n  \
           fixture_dir: '{}'\n  \
           targets:\n    \
             - extension: .mp3\n    \
             - extension: .wma\n    \
             - extension: .txt\n      \
               excluded_from_expectation: true\n  \
           engine:\n    \
             program: sh\n    \
             pre_args: ['-c', '{}', 'engine']\n    \
             timeout_secs: 30\n",
        fixture_dir.display(),
        script
    );
    if let Some(working_dir) = working_dir {
        yaml.push_str(&format!("    working_dir: '{}'\n", working_dir.display()));
    }
    fs::write(&path, yaml).expect("write config");
    path
}

pub fn touch(dir: &Path, name: &str) {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("mkdir");
    }
    fs::write(path, b"x").expect("write");
}
