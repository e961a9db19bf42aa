/// Configuration loading from probe.json
use crate::config::types::{ProbeError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Env var naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "LAMBDA_PROBE_CONFIG";

/// Config file looked up in the working directory when the env var is unset
pub const DEFAULT_CONFIG_FILE: &str = "probe.json";

/// Longest sleep the timeout fixture accepts (one hour)
pub const MAX_SLEEP_SECONDS: u64 = 60 * 60;

/// Largest block the reuse fixture retains per invocation
pub const MAX_MEMORY_BLOCK_BYTES: usize = 256 * 1024 * 1024;

const EVIDENCE_FILE_NAME: &str = "lambda-probe-evidence.log";

/// Fixed paths and sizes the fixtures operate on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// File the timeout fixture opens and never closes
    pub leak_file: PathBuf,
    /// How long the timeout fixture sleeps
    pub sleep_seconds: u64,
    /// Execution budget the sleep is meant to exceed
    pub assumed_budget_seconds: u64,
    /// Directory for the reuse fixture's per-invocation leak files
    pub leak_dir: PathBuf,
    /// Size of the memory block retained on every reuse invocation
    pub memory_block_bytes: usize,
    /// Candidate paths every evidence line is appended to
    pub evidence_paths: Vec<PathBuf>,
    /// Paths inspected for evidence left by earlier invocations
    pub check_paths: Vec<PathBuf>,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        let evidence_paths: Vec<PathBuf> = [
            "/tmp",
            "/var/tmp",
            "/var/task",
            "/opt",
            "/mnt/efs",
            "/home/sbx_user1051",
        ]
        .iter()
        .map(|dir| Path::new(dir).join(EVIDENCE_FILE_NAME))
        .collect();

        let check_paths = vec![
            evidence_paths[0].clone(),
            evidence_paths[1].clone(),
            evidence_paths[4].clone(),
        ];

        Self {
            leak_file: PathBuf::from("/tmp/leaked_file.txt"),
            sleep_seconds: 15,
            assumed_budget_seconds: 10,
            leak_dir: std::env::temp_dir(),
            memory_block_bytes: 1024 * 1024,
            evidence_paths,
            check_paths,
        }
    }
}

impl ProbeConfig {
    /// Load configuration from a JSON file
    ///
    /// Fields missing from the file keep their defaults.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ProbeError::Config(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;

        let config: ProbeConfig = serde_json::from_str(&content)
            .map_err(|e| ProbeError::Config(format!("Failed to parse config JSON: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Load from `$LAMBDA_PROBE_CONFIG`, then `./probe.json`, then built-in defaults
    pub fn load_default() -> Result<Self> {
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            if !path.trim().is_empty() {
                log::debug!("Loading probe config from ${}: {}", CONFIG_ENV_VAR, path);
                return Self::load_from_file(path);
            }
        }

        let local = std::env::current_dir()
            .map_err(|e| ProbeError::Config(format!("Failed to get current directory: {}", e)))?
            .join(DEFAULT_CONFIG_FILE);

        if local.exists() {
            log::debug!("Loading probe config from {}", local.display());
            return Self::load_from_file(local);
        }

        log::debug!("No probe config found, using built-in defaults");
        Ok(Self::default())
    }

    /// Reject configurations the fixtures cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.evidence_paths.is_empty() {
            return Err(ProbeError::Config(
                "evidence_paths must name at least one candidate".to_string(),
            ));
        }
        if self.memory_block_bytes == 0 {
            return Err(ProbeError::Config(
                "memory_block_bytes must be greater than zero".to_string(),
            ));
        }
        if self.memory_block_bytes > MAX_MEMORY_BLOCK_BYTES {
            return Err(ProbeError::Config(format!(
                "memory_block_bytes {} exceeds the limit of {}",
                self.memory_block_bytes, MAX_MEMORY_BLOCK_BYTES
            )));
        }
        if self.sleep_seconds > MAX_SLEEP_SECONDS {
            return Err(ProbeError::Config(format!(
                "sleep_seconds {} exceeds the limit of {}",
                self.sleep_seconds, MAX_SLEEP_SECONDS
            )));
        }
        Ok(())
    }

    pub fn sleep_duration(&self) -> Duration {
        Duration::from_secs(self.sleep_seconds)
    }

    pub fn assumed_budget(&self) -> Duration {
        Duration::from_secs(self.assumed_budget_seconds)
    }
}
