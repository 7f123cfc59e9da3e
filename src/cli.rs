use clap::{Parser, Subcommand};

// Display order for log level option (placed at end of help text)
const LOG_LEVEL_DISPLAY_ORDER: usize = 100;

/// CLI arguments
#[derive(Parser)]
#[command(name = "labelkeeper", version, about = "Validates bounding-box annotation files before training", long_about = None)]
pub struct Cli {
    /// Log level (see https://docs.rs/tracing-subscriber/latest/tracing_subscriber/filter/struct.EnvFilter.html)
    /// [env: LABELKEEPER_LOG=] [default: info]
    #[arg(
        long,
        env = "LABELKEEPER_LOG",
        default_value = "info",
        global = true,
        hide_default_value = true,
        hide_env = true,
        display_order = LOG_LEVEL_DISPLAY_ORDER,
        verbatim_doc_comment
    )]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a default labelkeeper.toml config file
    Init(InitArgs),
    /// Validate annotation files of a dataset
    Validate(ValidateArgs),
}

/// Arguments for the init command
#[derive(Parser)]
pub struct InitArgs {
    /// Path to config file
    #[arg(long, default_value = crate::config::DEFAULT_CONFIG_PATH)]
    pub config: String,

    /// Override existing config file
    #[arg(long)]
    pub r#override: bool,
}

/// Arguments for the validate command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Dataset root (overrides dataset.root from the config file)
    pub root: Option<String>,

    /// Path to config file (initialize with `labelkeeper init`).
    /// [default: labelkeeper.toml if present, otherwise built-in defaults]
    #[arg(long, verbatim_doc_comment)]
    pub config: Option<String>,

    /// Override config values using dot notation (e.g. dataset.extension=label)
    #[arg(long = "config-override")]
    pub config_overrides: Vec<String>,

    /// Output file path (.md or .json)
    #[arg(long)]
    pub output: Option<String>,
}
