//! Run configuration loaded from TOML
//!
//! ```toml
//! batch_size = 100
//! dry_run = false
//! tables = ["users", "posts"]
//! schema = true
//! data = true
//!
//! [resilience]
//! request_timeout_ms = 60000
//! max_attempts = 3
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use crate::api::{ResilienceConfig, ResilientGateway, RetryConfig, TableApiGateway};
use crate::sync::logic::batch::{BatchSize, DEFAULT_BATCH_SIZE};
use crate::sync::logic::content_hash::content_hash;
use crate::sync::{SyncOptions, SyncOrchestrator};

const APP_DIR: &str = "tablesync";
const CONFIG_FILE: &str = "config.toml";

/// Timeout and retry settings, in milliseconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResilienceSettings {
    pub request_timeout_ms: u64,
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_multiplier: f64,
    pub jitter: bool,
}

impl Default for ResilienceSettings {
    fn default() -> Self {
        let defaults = ResilienceConfig::default();
        Self {
            request_timeout_ms: defaults.request_timeout.as_millis() as u64,
            max_attempts: defaults.retry.max_attempts,
            base_delay_ms: defaults.retry.base_delay.as_millis() as u64,
            max_delay_ms: defaults.retry.max_delay.as_millis() as u64,
            backoff_multiplier: defaults.retry.backoff_multiplier,
            jitter: defaults.retry.jitter,
        }
    }
}

impl ResilienceSettings {
    pub fn to_config(&self) -> ResilienceConfig {
        ResilienceConfig {
            retry: RetryConfig {
                max_attempts: self.max_attempts,
                base_delay: Duration::from_millis(self.base_delay_ms),
                max_delay: Duration::from_millis(self.max_delay_ms),
                backoff_multiplier: self.backoff_multiplier,
                jitter: self.jitter,
            },
            request_timeout: Duration::from_millis(self.request_timeout_ms),
        }
    }
}

/// Settings for a sync run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub batch_size: usize,
    pub dry_run: bool,
    /// Only sync these tables
    pub tables: Option<Vec<String>>,
    /// Replay migrations
    pub schema: bool,
    /// Sync rows
    pub data: bool,
    pub resilience: ResilienceSettings,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            dry_run: false,
            tables: None,
            schema: true,
            data: true,
            resilience: ResilienceSettings::default(),
        }
    }
}

impl SyncConfig {
    /// Default config location (`~/.config/tablesync/config.toml` on Linux)
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
    }

    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml(&content).with_context(|| format!("Invalid config file {}", path.display()))
    }

    /// Load from the default location, falling back to defaults when absent
    pub fn load_default() -> Result<Self> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(&path),
            Some(path) => {
                log::debug!("No config at {}, using defaults", path.display());
                Ok(Self::default())
            }
            None => Ok(Self::default()),
        }
    }

    /// Parse and validate configuration from a TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: SyncConfig = toml::from_str(content).context("Failed to parse config")?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config")
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            bail!("batch_size must be greater than zero");
        }
        if !self.schema && !self.data {
            bail!("Nothing to sync: enable schema, data or both");
        }
        if self.resilience.max_attempts == 0 {
            bail!("resilience.max_attempts must be at least 1");
        }
        if self.resilience.request_timeout_ms == 0 {
            bail!("resilience.request_timeout_ms must be greater than zero");
        }
        if matches!(&self.tables, Some(tables) if tables.is_empty()) {
            bail!("tables is set but empty; remove it to sync every table");
        }
        Ok(())
    }

    /// Fingerprint of the effective settings, logged at the start of a run
    pub fn fingerprint(&self) -> Result<String> {
        let value = serde_json::to_value(self).context("Failed to serialize config")?;
        Ok(content_hash(&value))
    }

    pub fn to_options(&self) -> Result<SyncOptions> {
        self.validate()?;
        let batch_size = BatchSize::new(self.batch_size)
            .context("batch_size must be greater than zero")?;

        Ok(SyncOptions {
            batch_size,
            dry_run: self.dry_run,
            tables: self.tables.clone(),
            sync_schema: self.schema,
            sync_data: self.data,
        })
    }

    /// Wrap both gateways with the configured timeouts and retries
    pub fn build_orchestrator<S, T>(&self, source: S, target: T) -> Result<SyncOrchestrator>
    where
        S: TableApiGateway + 'static,
        T: TableApiGateway + 'static,
    {
        let options = self.to_options()?;
        let resilience = self.resilience.to_config();
        log::info!("Using config {}", self.fingerprint()?);

        let source: Arc<dyn TableApiGateway> =
            Arc::new(ResilientGateway::new(source, resilience.clone()));
        let target: Arc<dyn TableApiGateway> = Arc::new(ResilientGateway::new(target, resilience));

        Ok(SyncOrchestrator::new(source, target, options))
    }
}
