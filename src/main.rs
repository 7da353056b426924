//! Rideau Canal dashboard API server.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use chrono::Utc;
use clap::Parser;

use canal_ice_service::config::{ServiceConfig, StoreBackend, DEFAULT_CONFIG_PATH};
use canal_ice_service::dev_mode::DevMode;
use canal_ice_service::logging::{self, DataSource};
use canal_ice_service::{server, verify};

/// Rideau Canal ice monitoring API
#[derive(Parser, Debug)]
#[command(name = "canal_ice_service")]
#[command(about = "Serves Rideau Canal Skateway ice conditions and safety status")]
struct Args {
    /// Configuration file (TOML); defaults apply if it does not exist
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH, env = "CANAL_CONFIG")]
    config: PathBuf,

    /// Listen address, overriding the config file and PORT
    #[arg(short, long)]
    listen: Option<String>,

    /// Serve from a JSON fixture through the in-memory store
    #[arg(long, value_name = "FIXTURE")]
    dev: Option<PathBuf>,

    /// With --dev: shift fixture timestamps so the newest record is now
    #[arg(long, requires = "dev")]
    rebase: bool,

    /// Probe a running deployment instead of serving
    #[arg(long, value_name = "BASE_URL", conflicts_with = "dev")]
    verify: Option<String>,
}

fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    let args = Args::parse();

    if let Some(base_url) = &args.verify {
        // Blocking client; must run outside the tokio runtime.
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("failed to build HTTP client")?;
        let report = verify::verify_deployment(&client, base_url);
        verify::print_report(&report);
        if !report.passed() {
            std::process::exit(1);
        }
        return Ok(());
    }

    let config_existed = args.config.exists();
    let mut config = ServiceConfig::load_with_env(&args.config)
        .with_context(|| format!("loading configuration from {}", args.config.display()))?;

    if let Some(listen) = args.listen {
        config.server.listen = listen;
    }
    if let Some(fixture) = &args.dev {
        config.store.backend = StoreBackend::Memory;
        config.store.fixture_path = Some(fixture.clone());
    }
    config
        .validate()
        .with_context(|| format!("invalid configuration from {}", args.config.display()))?;

    logging::init_logger(&config.logging.level, config.logging.json);
    if config_existed {
        logging::info(
            DataSource::System,
            None,
            &format!("Loaded configuration from {}", args.config.display()),
        );
    } else {
        logging::warn(
            DataSource::System,
            None,
            &format!("{} not found, using defaults", args.config.display()),
        );
    }

    let dev = if args.rebase {
        DevMode::rebased_at(Utc::now())
    } else {
        DevMode::new()
    };

    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(threads) = config.server.worker_threads {
        runtime_builder.worker_threads(threads);
    }
    let runtime = runtime_builder.build().context("failed to create Tokio runtime")?;

    runtime.block_on(server::serve(config, dev))?;
    Ok(())
}
