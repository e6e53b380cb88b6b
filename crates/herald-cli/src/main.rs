//! Herald CLI - prioritized event dispatch from the command line
//!
//! # Configuration
//!
//! Configuration is loaded from multiple sources with priority:
//!
//! 1. CLI arguments (highest priority)
//! 2. Environment variables (`HERALD_*`)
//! 3. Explicit config file (`--config`)
//! 4. Project config (`.herald/config.toml` in the project root)
//! 5. Global config (`~/.herald/config.toml`)
//! 6. Default values (lowest priority)
//!
//! # Environment Variables
//!
//! - `HERALD_CONFIG`: Same as `--config`
//! - `HERALD_DEBUG`: Enable debug logging (`true`/`false`)
//! - `HERALD_STORAGE`: Directory for diagnostics log files
//! - `HERALD_MAX_LOG_SIZE`: Rotation threshold in bytes

mod tracing_writer;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use herald_cli::app;
use herald_cli::config::{ConfigLoader, HeraldConfig};
use herald_log::FileSink;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Herald CLI - prioritized event dispatch
#[derive(Parser, Debug)]
#[command(name = "herald")]
#[command(version, about, long_about = None)]
struct Args {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Project root directory (defaults to current directory)
    #[arg(short = 'C', long, global = true)]
    project: Option<PathBuf>,

    /// Additional config file, layered above the project config
    #[arg(short, long, global = true, value_name = "FILE", env = "HERALD_CONFIG")]
    config: Option<PathBuf>,

    /// Also write tracing output to this file
    #[arg(long, global = true, value_name = "PATH")]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Notify an event and print its output as JSON
    Run {
        /// Event name
        event: String,

        /// Params as a JSON object
        #[arg(long, value_name = "JSON")]
        params: Option<String>,

        /// Indent the output
        #[arg(long)]
        pretty: bool,
    },

    /// List events and their handlers in dispatch order
    Events,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let project_root = match &args.project {
        Some(p) => p.clone(),
        None => std::env::current_dir().context("cannot determine current directory")?,
    };

    let config = load_config(&args, &project_root)?;
    init_tracing(&args, &config);

    info!(path = %project_root.display(), "Project root");
    info!(
        storage = %config.logging.storage.display(),
        listeners = config.listeners.len(),
        "Configuration loaded"
    );

    let sink = Arc::new(FileSink::new(config.logging.clone()));
    let mut controller = app::build_controller(&config, sink);
    controller.capture_panics();

    match args.command {
        Command::Run {
            event,
            params,
            pretty,
        } => {
            let params = app::parse_params(params.as_deref());
            match app::run_event(&mut controller, &event, params, pretty) {
                Some(output) => println!("{output}"),
                None => info!(event = %event, "No such event"),
            }
        }
        Command::Events => print!("{}", app::list_events(&mut controller)),
    }

    controller.close();
    Ok(())
}

/// Loads, overrides and validates configuration.
fn load_config(args: &Args, project_root: &std::path::Path) -> Result<HeraldConfig> {
    let mut loader = ConfigLoader::new().with_project_root(project_root);
    if let Some(ref path) = args.config {
        loader = loader.with_config_file(path);
    }

    let mut config = loader
        .load()
        .map_err(|e| anyhow::anyhow!("Config error: {e}"))?;

    // CLI args override (highest priority)
    if args.debug {
        config.debug = true;
    }
    config.resolve_storage(project_root);

    if let Err(e) = config.validate() {
        bail!("Config error: {e}");
    }
    Ok(config)
}

/// Terminal filter: --debug > --verbose > RUST_LOG env > default "warn".
fn init_tracing(args: &Args, config: &HeraldConfig) {
    let terminal_filter = if config.debug {
        EnvFilter::new("debug")
    } else if args.verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    let terminal_layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    let file_writer = args
        .log_file
        .as_deref()
        .and_then(tracing_writer::FileMakeWriter::open);

    if let Some(writer) = file_writer {
        let file_layer = fmt::layer()
            .with_target(false)
            .with_ansi(false)
            .with_writer(writer);

        tracing_subscriber::registry()
            .with(terminal_layer.with_filter(terminal_filter))
            .with(file_layer.with_filter(EnvFilter::new("debug")))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(terminal_layer.with_filter(terminal_filter))
            .init();
    }
}
