use anyhow::Result;

use crate::checksum;
use crate::cli::commands::Command;

pub struct CheckDigitCommand {
    pub payload: String,
}

impl CheckDigitCommand {
    pub fn new(payload: impl Into<String>) -> Self {
        Self {
            payload: payload.into(),
        }
    }
}

impl Command for CheckDigitCommand {
    async fn execute(&self) -> Result<()> {
        let digit = checksum::compute_check_digit(&self.payload);
        println!("🔢 Check digit: {digit}");
        println!("   Full code: {}{}", self.payload, digit);
        Ok(())
    }
}
