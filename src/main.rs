use anyhow::Result;
use clap::Parser;
use tracing::Instrument;

use capture_guide::cli::commands::{
    CheckDigitCommand, Command, ConfigCommand, DemoCommand, LotCommand, ValidateCommand,
};
use capture_guide::cli::{Cli, Commands};
use capture_guide::{config, create_operation_span, init_telemetry};

fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = config()?.clone();
    init_telemetry(&settings.observability)?;

    let runtime = tokio::runtime::Runtime::new()?;
    match cli.command {
        Commands::CheckDigit { payload } => {
            runtime.block_on(async { CheckDigitCommand::new(payload).execute().await })
        }
        Commands::Validate { code } => {
            runtime.block_on(async { ValidateCommand::new(code).execute().await })
        }
        Commands::Lot { payload } => {
            runtime.block_on(async { LotCommand::new(payload).execute().await })
        }
        Commands::Demo {
            payload,
            output_dir,
            json,
        } => runtime.block_on(
            async {
                DemoCommand::new(settings)
                    .with_payload(payload)
                    .with_output_dir(output_dir)
                    .with_json(json)
                    .execute()
                    .await
            }
            .instrument(create_operation_span("demo", None)),
        ),
        Commands::Config { save } => runtime.block_on(async {
            ConfigCommand::new(settings).with_save(save).execute().await
        }),
    }
}
