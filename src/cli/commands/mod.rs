use anyhow::Result;

pub mod check_digit;
pub mod config;
pub mod demo;
pub mod lot;
pub mod validate;

pub use check_digit::CheckDigitCommand;
pub use config::ConfigCommand;
pub use demo::DemoCommand;
pub use lot::LotCommand;
pub use validate::ValidateCommand;

#[allow(async_fn_in_trait)]
pub trait Command {
    async fn execute(&self) -> Result<()>;
}
