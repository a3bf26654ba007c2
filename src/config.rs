use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::capture::state_machine::Timings;

/// Base name of the optional configuration file
pub const CONFIG_FILE: &str = "capture-guide";
/// Prefix for environment overrides, e.g. `CAPTURE_GUIDE__TIMINGS__ENTRY_FADE_MS`
pub const ENV_PREFIX: &str = "CAPTURE_GUIDE";

/// Main configuration structure for the capture guide
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CaptureGuideConfig {
    /// Workflow durations
    pub timings: TimingsConfig,
    /// Logging settings
    pub observability: ObservabilityConfig,
    /// Simulated session used by the `demo` command
    pub demo: DemoConfig,
}

/// Durations in milliseconds
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TimingsConfig {
    pub entry_fade_ms: u64,
    pub exit_fade_ms: u64,
    pub success_animation_ms: u64,
    /// Pause on the success tint before the step fades out
    pub success_hold_ms: u64,
    pub focus_indicator_ms: u64,
    pub shutter_delay_ms: u64,
    pub shutter_rise_ms: u64,
    pub shutter_fall_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Default filter when RUST_LOG is unset
    pub log_level: String,
    /// Emit JSON log lines instead of text
    pub json_logs: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DemoConfig {
    /// Directory the simulated camera names its photos under
    pub output_dir: String,
    pub shot_latency_ms: u64,
    /// Grace period of the kit QR step
    pub qr_grace_ms: u64,
    pub emulated: bool,
}

impl Default for CaptureGuideConfig {
    fn default() -> Self {
        let timings = Timings::default();
        Self {
            timings: TimingsConfig::from(&timings),
            observability: ObservabilityConfig {
                log_level: "info".to_string(),
                json_logs: false,
            },
            demo: DemoConfig {
                output_dir: "/tmp/capture-guide/cache".to_string(),
                shot_latency_ms: 120,
                qr_grace_ms: 1500,
                emulated: true,
            },
        }
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

impl From<&Timings> for TimingsConfig {
    fn from(timings: &Timings) -> Self {
        Self {
            entry_fade_ms: millis(timings.entry_fade),
            exit_fade_ms: millis(timings.exit_fade),
            success_animation_ms: millis(timings.success_animation),
            success_hold_ms: millis(timings.success_hold),
            focus_indicator_ms: millis(timings.focus_indicator),
            shutter_delay_ms: millis(timings.shutter_delay),
            shutter_rise_ms: millis(timings.shutter_rise),
            shutter_fall_ms: millis(timings.shutter_fall),
        }
    }
}

impl TimingsConfig {
    pub fn to_timings(&self) -> Timings {
        Timings {
            entry_fade: Duration::from_millis(self.entry_fade_ms),
            exit_fade: Duration::from_millis(self.exit_fade_ms),
            success_animation: Duration::from_millis(self.success_animation_ms),
            success_hold: Duration::from_millis(self.success_hold_ms),
            focus_indicator: Duration::from_millis(self.focus_indicator_ms),
            shutter_delay: Duration::from_millis(self.shutter_delay_ms),
            shutter_rise: Duration::from_millis(self.shutter_rise_ms),
            shutter_fall: Duration::from_millis(self.shutter_fall_ms),
        }
    }
}

impl CaptureGuideConfig {
    /// Load configuration with precedence:
    /// 1. Default values
    /// 2. `capture-guide.toml` in the working directory
    /// 3. Environment variables (prefixed with CAPTURE_GUIDE__)
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new("."))
    }

    /// Same as [`load`](Self::load) but looks for the file in `dir`
    pub fn load_from(dir: &Path) -> Result<Self> {
        let defaults = Config::try_from(&Self::default())
            .context("Failed to serialize default configuration")?;
        let mut builder = Config::builder().add_source(defaults);

        let file = dir.join(format!("{CONFIG_FILE}.toml"));
        if file.exists() {
            builder = builder.add_source(File::from(file.as_path()));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder
            .build()
            .with_context(|| format!("Failed to read configuration from {}", dir.display()))?;
        config
            .try_deserialize()
            .context("Invalid capture guide configuration")
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let toml_content = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_content)?;
        Ok(())
    }

    /// Load .env file if it exists
    pub fn load_env_file() -> Result<()> {
        if Path::new(".env").exists() {
            dotenvy::dotenv()?;
            tracing::info!("Loaded environment variables from .env file");
        }
        Ok(())
    }
}

/// Global configuration instance
static CONFIG: std::sync::LazyLock<Result<CaptureGuideConfig, anyhow::Error>> =
    std::sync::LazyLock::new(|| {
        let _ = CaptureGuideConfig::load_env_file();
        CaptureGuideConfig::load()
    });

/// Get the global configuration
pub fn config() -> Result<&'static CaptureGuideConfig> {
    CONFIG
        .as_ref()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {:#}", e))
}

/// Initialize configuration (called at startup)
pub fn init_config() -> Result<()> {
    let _config = config()?;
    tracing::info!("Configuration loaded successfully");
    Ok(())
}
