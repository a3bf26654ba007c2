use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::cli::commands::Command;
use crate::config::CaptureGuideConfig;

pub struct ConfigCommand {
    pub config: CaptureGuideConfig,
    pub save: Option<PathBuf>,
}

impl ConfigCommand {
    pub fn new(config: CaptureGuideConfig) -> Self {
        Self { config, save: None }
    }

    pub fn with_save(mut self, save: Option<PathBuf>) -> Self {
        self.save = save;
        self
    }
}

impl Command for ConfigCommand {
    async fn execute(&self) -> Result<()> {
        let rendered = toml::to_string_pretty(&self.config)?;
        println!("{rendered}");

        if let Some(path) = &self.save {
            self.config
                .save_to_file(path)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("💾 Saved to {}", path.display());
        }
        Ok(())
    }
}
