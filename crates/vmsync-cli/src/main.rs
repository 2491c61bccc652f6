use anyhow::Result;
use clap::Parser;

use vmsync_cli::cli::{Cli, Commands};
use vmsync_cli::commands;
use vmsync_cli::config::{AppConfig, loader};
use vmsync_cli::context::AccountContext;
use vmsync_cli::observability;
use vmsync_cli::output::print_error;

#[tokio::main]
async fn main() {
    // .env is optional
    if let Err(e) = dotenvy::dotenv()
        && !matches!(e, dotenvy::Error::Io(ref io_err) if io_err.kind() == std::io::ErrorKind::NotFound)
    {
        eprintln!("Warning: Failed to load .env file: {e}");
    }

    observability::init_tracing();

    if let Err(e) = run().await {
        print_error(&format!("{e:#}"));
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    let config_path = loader::resolve_path(cli.config.as_deref());
    let config = match loader::load_config(config_path.as_deref()) {
        Ok(config) => config,
        Err(e) => anyhow::bail!("Configuration error: {e}"),
    };
    observability::apply_logging_level(&config.logging.level);
    tracing::debug!(
        path = %config_path.as_deref().map(|p| p.display().to_string()).unwrap_or_default(),
        accounts = config.accounts.len(),
        "configuration loaded"
    );

    let args = cli.command.account();
    match dispatch(&cli.command, &config).await {
        Ok(()) => Ok(()),
        Err(e) if !args.debug => {
            tracing::error!(account = %args.account, error = %format!("{e:#}"), "command failed");
            print_error(&format!("{e:#}"));
            Ok(())
        }
        Err(e) => Err(e),
    }
}

async fn dispatch(command: &Commands, config: &AppConfig) -> Result<()> {
    let args = command.account();
    let ctx = AccountContext::open(config, &args.account, args.debug).await?;

    match command {
        Commands::Import(_) => commands::import::run(&ctx).await,
        Commands::Inventorize(args) => {
            let mode = commands::inventorize::ingest_mode(args.individual);
            commands::inventorize::labels(&ctx, mode).await
        }
        Commands::ExportCustomAttributes(args) => commands::export::run(&ctx, args.dry_run).await,
        Commands::InventorizeCustomAttributes(args) => {
            let mode = commands::inventorize::ingest_mode(args.individual);
            commands::inventorize::custom_attributes(&ctx, mode).await
        }
        Commands::List(args) => {
            commands::list::list(&ctx, args.include_templates, args.format).await
        }
        Commands::Compare(_) => commands::list::compare(&ctx).await,
        Commands::TestConnection(_) => commands::test_connection::run(&ctx).await,
    }
}
