mod cacti;
mod cli;
mod config;
mod error;
mod models;
mod netdot;
mod sync;
mod utils;

use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cacti::cli::CactiCli;
use cacti::CactiClient;
use cli::{CliError, Source};
use config::{Config, SyncSettings};
use models::DeviceGroups;
use netdot::NetdotClient;
use sync::Reconciler;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let argv: Vec<String> = std::env::args().collect();
    let args = match cli::parse_args(&argv) {
        Ok(args) => args,
        Err(CliError::Help) => {
            println!("{}", cli::usage());
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            eprintln!("{}\n\n{}", e, cli::usage());
            return ExitCode::from(1);
        }
    };

    // Initialize tracing
    let default_filter = if args.debug {
        "netdot_cacti_sync=debug"
    } else {
        "netdot_cacti_sync=info"
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cfg = Config::load();
    let source = match args.source(cfg.source) {
        Ok(Some(source)) => source,
        Ok(None) => {
            println!("{}", cli::usage());
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            tracing::error!("{}", e);
            eprintln!("\n{}", cli::usage());
            return ExitCode::from(1);
        }
    };

    match run(&cfg, source, args.no_graphs).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::from(1)
        }
    }
}

async fn run(cfg: &Config, source: Source, no_graphs: bool) -> anyhow::Result<()> {
    let settings = SyncSettings::load(&cfg.sync_config).await?;

    let records = match source {
        Source::File(path) => {
            tracing::info!("Reading devices from {}", path.display());
            netdot::load_file(&path).await?
        }
        Source::Netdot => {
            let netdot = NetdotClient::connect(&cfg.netdot_db_url, cfg.db_max_connections).await?;
            netdot::load_from_netdot(&netdot, &settings).await?
        }
    };
    let groups: DeviceGroups = records.into_iter().collect();
    if groups.is_empty() {
        tracing::warn!("No devices loaded, every node in the {} tree will be removed", settings.tree_name);
    } else {
        tracing::info!("Loaded {} devices in {} groups", groups.len(), groups.group_count());
    }

    let cli = CactiCli::new(&cfg.php_bin, &cfg.cacti_path)?;
    let cacti = CactiClient::connect(&cfg.cacti_db_url, cfg.db_max_connections, cli).await?;
    tracing::info!("Connected to Cacti (pool_size={})", cfg.db_max_connections);

    let result = Reconciler::new(&cacti, &settings).with_graphs(!no_graphs).run(&groups).await?;
    tracing::info!("{}", result.message);
    for error in &result.result.errors {
        tracing::warn!("{}", error);
    }
    tracing::debug!("{}", serde_json::to_string(&result)?);
    Ok(())
}
