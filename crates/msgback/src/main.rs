use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use msgback::config::load_config;
use msgback::context::RunContext;
use msgback::convert::MailConverter;
use msgback::ledger::RunLedger;
use msgback::saga::{MigrationSaga, ReversalSaga};
use msgback::select::select_candidates;
use msgback::staging::Staging;
use msgback::store::RestStore;
use msgback::MsgbackError;

/// Migrates message documents in the remote store into their extracted parts.
#[derive(Parser)]
#[command(name = "msgback", version, about)]
struct Cli {
    /// Path to the configuration file.
    #[arg(long, default_value = "msgback.json")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Migrate message documents, bounded by the configured batch cap.
    Run {
        /// Process every eligible document instead of a bounded batch.
        #[arg(long)]
        no_limit: bool,
    },
    /// Delete derived documents and restore the original metadata.
    Undo,
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
}

async fn run(cli: Cli) -> Result<(), MsgbackError> {
    let config = load_config(&cli.config)?;
    let credentials = config.store_credentials()?;
    let store = RestStore::connect(&credentials, &config.api_version).await?;

    match cli.command {
        Command::Run { no_limit } => {
            let ctx = RunContext::create(&config, !no_limit)?;
            let ledger = RunLedger::new(ctx.log_dir());
            let staging = Staging::new(ctx.staging_root());
            staging.prepare()?;

            let candidates =
                select_candidates(&store, ctx.message_extension(), ctx.cap(), &ledger).await?;
            let saga = MigrationSaga::new(&store, &MailConverter, &staging, &ledger);
            let report = saga.run(&candidates).await?;

            info!(
                "Migration finished: {} migrated, {} failed (ledger: {})",
                report.migrated,
                report.failed,
                ctx.log_dir().display()
            );
        }
        Command::Undo => {
            let ctx = RunContext::create(&config, false)?;
            let ledger = RunLedger::new(ctx.log_dir());

            let saga = ReversalSaga::new(&store, &ledger);
            let report = saga.run(ctx.message_extension()).await?;

            info!(
                "Reversal finished: {} restored, {} failed (ledger: {})",
                report.reversed,
                report.failed,
                ctx.log_dir().display()
            );
        }
    }

    Ok(())
}
