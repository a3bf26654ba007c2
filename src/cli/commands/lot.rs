use anyhow::{Context, Result};

use crate::barcode;
use crate::cli::commands::Command;

pub struct LotCommand {
    pub payload: String,
}

impl LotCommand {
    pub fn new(payload: impl Into<String>) -> Self {
        Self {
            payload: payload.into(),
        }
    }
}

impl Command for LotCommand {
    async fn execute(&self) -> Result<()> {
        let lot = barcode::parse_lot_number(&self.payload)
            .with_context(|| format!("Rejected barcode payload '{}'", self.payload))?;
        println!("🏷️  Lot number: {lot}");
        Ok(())
    }
}
