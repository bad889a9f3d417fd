//! QAnnotate - terminal annotation tool for generated QA datasets
//!
//! Presents machine-generated question/answer pairs to human annotators,
//! collects naturalness/adequacy/correctness judgments, and persists them
//! to per-user JSON profiles (plus a SQuAD v2 rendition).
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (invalid flags, missing password file, bad data, etc.)

mod auth;
mod cli;
mod config;
mod dataset;
mod export;
mod guidelines;
mod models;
mod profile;
mod session;
mod tui;

use anyhow::{Context, Result};
use auth::PasswordGate;
use cli::Args;
use config::Config;
use dataset::RunMode;
use profile::DataLayout;
use std::path::Path;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Load configuration
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);

    // Handle --list-users: print profiles and exit, no TUI
    if args.list_users {
        return handle_list_users(&args, &config);
    }

    // Initialize logging; the TUI owns the screen, so logs go to a file
    let _log_guard = init_logging(&args, &config)?;

    info!("QAnnotate v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    // Run the annotation tool
    match run_tool(args, config).await {
        Ok(()) => Ok(()),
        Err(e) => {
            error!("Annotation tool failed: {}", e);
            eprintln!("\n❌ Error: {}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .qannotate.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(".qannotate.toml");

    if path.exists() {
        eprintln!("⚠️  .qannotate.toml already exists. Remove it first or edit it manually.");
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).context("Failed to write .qannotate.toml")?;

    println!("✅ Created .qannotate.toml with default settings.");
    println!("   Edit it to customize paths, completion codes, and shuffling.");
    Ok(())
}

/// Handle --list-users: print the profiles for the selected mode.
fn handle_list_users(args: &Args, config: &Config) -> Result<()> {
    let mode = args.run_mode();
    let layout = DataLayout::new(&config.paths, mode);

    let users = profile::list_users(&layout);
    if users.is_empty() {
        println!("No profiles found under {}", layout.profiles_root().display());
        return Ok(());
    }

    println!("Profiles under {} ({} mode):", layout.profiles_root().display(), mode);
    for user in users {
        let store = profile::ProfileStore::new(&layout, &user);
        let marker = if store.is_complete() { "✅" } else { "⏳" };
        println!("  {} {}", marker, user);
    }
    Ok(())
}

/// Initialize logging into the configured log file.
///
/// The returned guard flushes the non-blocking writer on drop; it must stay
/// alive for the lifetime of the program.
fn init_logging(
    args: &Args,
    config: &Config,
) -> Result<tracing_appender::non_blocking::WorkerGuard> {
    let level = if config.general.verbose && !args.quiet {
        tracing::Level::DEBUG
    } else {
        args.log_level()
    };

    let log_path = &config.general.log_file;
    let directory = match log_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let file_name = log_path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "qannotate.log".to_string());

    let appender = tracing_appender::rolling::never(directory, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_ansi(false)
        .with_writer(writer)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;
    Ok(guard)
}

/// Run the complete annotation workflow.
async fn run_tool(args: Args, config: Config) -> Result<()> {
    let mode = args.run_mode();
    info!("Running in {} mode", mode);

    // Resolve the password gate up front: without --insecure, a missing
    // password file is a configuration error that must fail startup
    let gate = if args.insecure {
        warn!("Running in insecure mode. Not asking for a password.");
        None
    } else {
        Some(PasswordGate::load(&config.paths.password_file)?)
    };

    let layout = DataLayout::new(&config.paths, mode);

    std::fs::create_dir_all(layout.profiles_root()).with_context(|| {
        format!(
            "Failed to create annotations directory: {}",
            layout.profiles_root().display()
        )
    })?;

    // Step 1: Load the dataset for this mode
    let data_path = mode.data_filepath(&layout.input_dir);
    info!("Looking for data at {}", data_path.display());
    let records = dataset::load_dataset(&data_path)?;

    let completion_code = match mode {
        RunMode::Preliminary => config.study.preliminary_completion_code.clone(),
        _ => config.study.completion_code.clone(),
    };

    // Step 2: Hand over to the TUI for the interactive flow
    let mut app = tui::App::new(tui::AppOptions {
        gate,
        layout,
        records,
        shuffle: config.study.shuffle,
        completion_code,
        platform: config.study.platform.clone(),
    });

    app.run().await
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => Ok(config),
        Ok(None) => Ok(Config::default()),
        Err(e) => {
            eprintln!("Warning: failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}
