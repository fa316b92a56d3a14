use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub mining: MiningConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub worker: WorkerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MiningConfig {
    /// Codes per bulk merge for whole-document mining.
    #[serde(default = "default_mining_batch_size")]
    pub batch_size: usize,
    /// Documents larger than this are mined page-by-page.
    #[serde(default = "default_stream_threshold")]
    pub stream_threshold_bytes: u64,
    /// Documents excluded from default directory runs (e.g. an oversized
    /// interchange manual routed to an explicit invocation instead).
    #[serde(default)]
    pub exclude_globs: Vec<String>,
    /// Emit a page progress line every N pages in streaming mode.
    #[serde(default = "default_page_log_interval")]
    pub page_log_interval: usize,
}

impl Default for MiningConfig {
    fn default() -> Self {
        Self {
            batch_size: default_mining_batch_size(),
            stream_threshold_bytes: default_stream_threshold(),
            exclude_globs: Vec::new(),
            page_log_interval: default_page_log_interval(),
        }
    }
}

fn default_mining_batch_size() -> usize {
    500
}
fn default_stream_threshold() -> u64 {
    8 * 1024 * 1024
}
fn default_page_log_interval() -> usize {
    50
}

#[derive(Debug, Deserialize, Clone)]
pub struct ClassifierConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    /// Codes per classification request. Small, to keep a single request
    /// within the classifier's input-size and latency budget.
    #[serde(default = "default_classifier_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            provider: "disabled".to_string(),
            model: None,
            batch_size: default_classifier_batch_size(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_provider() -> String {
    "disabled".to_string()
}
fn default_classifier_batch_size() -> usize {
    20
}
fn default_timeout_secs() -> u64 {
    30
}

impl ClassifierConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

/// Backoff policy for the classification loop, expressed as data so failure
/// kinds map to durations in one place (see [`crate::worker::FailureKind`]).
#[derive(Debug, Deserialize, Clone)]
pub struct WorkerConfig {
    /// Sleep between polls when the queue is empty.
    #[serde(default = "default_idle_backoff")]
    pub idle_backoff_secs: u64,
    /// Sleep after the classifier signals a rate limit.
    #[serde(default = "default_rate_limit_backoff")]
    pub rate_limit_backoff_secs: u64,
    /// Sleep after a transient or malformed-response failure.
    #[serde(default = "default_retry_backoff")]
    pub retry_backoff_secs: u64,
    /// Mandatory pacing between successful batches.
    #[serde(default = "default_pacing")]
    pub pacing_secs: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            idle_backoff_secs: default_idle_backoff(),
            rate_limit_backoff_secs: default_rate_limit_backoff(),
            retry_backoff_secs: default_retry_backoff(),
            pacing_secs: default_pacing(),
        }
    }
}

fn default_idle_backoff() -> u64 {
    12
}
fn default_rate_limit_backoff() -> u64 {
    60
}
fn default_retry_backoff() -> u64 {
    5
}
fn default_pacing() -> u64 {
    1
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    // Validate mining
    if config.mining.batch_size == 0 {
        anyhow::bail!("mining.batch_size must be > 0");
    }

    // Validate classifier
    if config.classifier.batch_size == 0 {
        anyhow::bail!("classifier.batch_size must be > 0");
    }
    if config.classifier.is_enabled() && config.classifier.model.is_none() {
        anyhow::bail!(
            "classifier.model must be specified when provider is '{}'",
            config.classifier.provider
        );
    }

    match config.classifier.provider.as_str() {
        "disabled" | "groq" => {}
        other => anyhow::bail!(
            "Unknown classifier provider: '{}'. Must be disabled or groq.",
            other
        ),
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(dir: &tempfile::TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("skuh.toml");
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn minimal_config_uses_defaults() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = write_config(&tmp, "[db]\npath = \"./data/skuh.sqlite\"\n");
        let config = load_config(&path).unwrap();
        assert_eq!(config.mining.batch_size, 500);
        assert_eq!(config.classifier.batch_size, 20);
        assert_eq!(config.worker.rate_limit_backoff_secs, 60);
        assert!(!config.classifier.is_enabled());
    }

    #[test]
    fn enabled_classifier_requires_model() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = write_config(
            &tmp,
            "[db]\npath = \"./data/skuh.sqlite\"\n\n[classifier]\nprovider = \"groq\"\n",
        );
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = write_config(
            &tmp,
            "[db]\npath = \"./data/skuh.sqlite\"\n\n[classifier]\nprovider = \"openai\"\nmodel = \"x\"\n",
        );
        assert!(load_config(&path).is_err());
    }
}
