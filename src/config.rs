use std::path::{Path, PathBuf};

use serde::Deserialize;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::compare::DetectionMode;
use crate::inventory::SupportTable;
use crate::target::{TargetExtension, normalize_extension};

/// Environment variable naming an alternate YAML config file.
pub const CONFIG_ENV: &str = "EXTCHECK_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error reading {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Deserialize, Clone)]
pub struct EngineConfig {
    pub program: String,
    #[serde(default)]
    pub pre_args: Vec<String>,
    #[serde(default = "default_subcommand")]
    pub subcommand: String,
    #[serde(default)]
    pub extra_flags: Vec<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub working_dir: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct VerifyConfig {
    pub fixture_dir: PathBuf,
    #[serde(default)]
    pub detection: DetectionMode,
    pub targets: Vec<TargetExtension>,
    pub engine: EngineConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub run_id: String,
    pub supported_extensions: Vec<String>,
    pub verify: VerifyConfig,
}

impl Config {
    /// Classification table handed to the extension counter.
    pub fn support_table(&self) -> SupportTable {
        SupportTable::new(&self.supported_extensions)
    }
}

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: Config,
    pub config_hash: String,
}

fn default_subcommand() -> String {
    crate::engine::DEFAULT_SUBCOMMAND.to_string()
}

fn default_timeout_secs() -> u64 {
    crate::engine::DEFAULT_TIMEOUT.as_secs()
}

pub fn load_config(path: Option<&Path>) -> Result<LoadedConfig, ConfigError> {
    let bytes: Vec<u8> = if let Some(p) = path {
        std::fs::read(p).map_err(|source| ConfigError::Io {
            path: p.to_path_buf(),
            source,
        })?
    } else {
        include_bytes!("../config/default.yml").to_vec()
    };

    let mut config: Config = serde_yaml::from_slice(&bytes)?;
    if config.run_id.trim().is_empty() {
        config.run_id = generate_run_id();
    }
    normalize(&mut config);
    validate(&config)?;

    let config_hash = hash_bytes(&bytes);

    Ok(LoadedConfig { config, config_hash })
}

/// Load from `EXTCHECK_CONFIG` when set, otherwise the embedded defaults.
pub fn load_from_env() -> Result<LoadedConfig, ConfigError> {
    let path = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
    load_config(path.as_deref())
}

fn normalize(config: &mut Config) {
    for ext in &mut config.supported_extensions {
        *ext = normalize_extension(ext);
    }
    for target in &mut config.verify.targets {
        target.extension = normalize_extension(&target.extension);
    }
}

fn validate(config: &Config) -> Result<(), ConfigError> {
    let verify = &config.verify;
    if verify.targets.is_empty() {
        return Err(ConfigError::Invalid("verify.targets is empty".to_string()));
    }
    if verify.targets.iter().any(|t| t.extension.is_empty()) {
        return Err(ConfigError::Invalid(
            "verify.targets contains an empty extension".to_string(),
        ));
    }
    if verify.fixture_dir.as_os_str().is_empty() {
        return Err(ConfigError::Invalid("verify.fixture_dir is empty".to_string()));
    }
    if verify.engine.program.trim().is_empty() {
        return Err(ConfigError::Invalid("verify.engine.program is empty".to_string()));
    }
    if verify.engine.timeout_secs == 0 {
        return Err(ConfigError::Invalid(
            "verify.engine.timeout_secs must be positive".to_string(),
        ));
    }
    Ok(())
}

fn hash_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let digest = hasher.finalize();
    hex::encode(digest)
}

fn generate_run_id() -> String {
    let now = chrono::Utc::now();
    format!("{}_{}", now.format("%Y%m%dT%H%M%SZ"), rand_suffix())
}

fn rand_suffix() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    format!("{:08x}", nanos)
}
