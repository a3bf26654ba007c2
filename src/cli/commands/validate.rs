use anyhow::{bail, Result};

use crate::checksum;
use crate::cli::commands::Command;

pub struct ValidateCommand {
    pub code: String,
}

impl ValidateCommand {
    pub fn new(code: impl Into<String>) -> Self {
        Self { code: code.into() }
    }
}

impl Command for ValidateCommand {
    async fn execute(&self) -> Result<()> {
        if !checksum::validate(&self.code) {
            bail!("'{}' failed checksum validation", self.code);
        }
        if self.code == checksum::OVERRIDE_CODE {
            println!("✅ {} accepted (manual override)", self.code);
        } else {
            println!("✅ {} is valid", self.code);
        }
        Ok(())
    }
}
