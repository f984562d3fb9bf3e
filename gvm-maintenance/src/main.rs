use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use gvm_maintenance::constants::defaults;
use gvm_maintenance::{
    Collaborators, ConfigManager, GvmCliClient, MaintenanceOrchestrator, PgStore, SystemCommandRunner,
    SystemdServices,
};

#[derive(Debug, Parser)]
#[command(name = "gvm-maintenance", version, about = "Maintenance run for a GVM/OpenVAS host")]
struct Cli {
    /// Report what would be done without changing anything
    #[arg(long)]
    dry_run: bool,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Path to the TOML configuration
    #[arg(long, default_value = defaults::CONFIG_PATH)]
    config: PathBuf,
}

fn init_logging(verbose: bool) -> Result<()> {
    let level = if verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::from_default_env()
        .add_directive(format!("gvm_maintenance={}", level).parse()?)
        .add_directive(format!("gvm_host={}", level).parse()?)
        .add_directive("sqlx=warn".parse()?)
        .add_directive("reqwest=warn".parse()?);

    fmt().with_env_filter(env_filter).init();
    Ok(())
}

async fn run(cli: Cli) -> Result<u8> {
    let config_manager = ConfigManager::new(&cli.config).await?;
    let config = config_manager.get_current_config();
    info!("Configuration loaded from {}", cli.config.display());

    let runner = Arc::new(SystemCommandRunner);
    let store = Arc::new(PgStore::connect_lazy(&config.database.url)?);
    let client = Arc::new(GvmCliClient::new(&config, runner.clone()));

    let collaborators = Collaborators {
        runner,
        services: Arc::new(SystemdServices),
        store,
        client,
    };

    let mut orchestrator = MaintenanceOrchestrator::new(config, collaborators);
    let outcome = orchestrator.run(cli.dry_run).await?;

    println!("{}", outcome.report.render_summary());
    info!("Report written to {}", outcome.persisted.text_path.display());

    Ok(outcome.exit_code)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.verbose) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    match run(cli).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            error!("{:#}", e);
            ExitCode::from(1)
        }
    }
}
