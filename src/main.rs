mod cli;
mod config;
mod rule;
mod scan;
mod types;

use clap::Parser;
use cli::{Cli, Commands};
use config::Config;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const EXIT_FAILURE: i32 = 1;

fn main() {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    match &cli.command {
        Commands::Init(args) => {
            if let Err(e) = config::write_default(&args.config, args.r#override) {
                error!("{:#}", e);
                std::process::exit(EXIT_FAILURE);
            }
            info!("Config written to {}", args.config);
        }
        Commands::Validate(args) => {
            let mut config = Config::load(args.config.as_deref(), &args.config_overrides)
                .unwrap_or_else(|e| {
                    error!("Failed to load config: {:#}", e);
                    std::process::exit(EXIT_FAILURE);
                });
            if let Some(root) = &args.root {
                config.dataset.root = root.into();
            }

            match scan::orchestrator::run(&config, args.output.as_deref()) {
                Ok(true) => {}
                Ok(false) => std::process::exit(EXIT_FAILURE),
                Err(e) => {
                    error!("{:#}", e);
                    std::process::exit(EXIT_FAILURE);
                }
            }
        }
    }
}

/// Log to stderr so the report on stdout stays clean
fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_new(log_level).unwrap_or_else(|e| {
        eprintln!("Invalid log level '{}': {}, falling back to info", log_level, e);
        EnvFilter::new("info")
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
