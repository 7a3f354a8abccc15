//! bl4_auto_crypter - save file converter and folder sync
//!
//! Converts encrypted binary save files to and from editable YAML, and keeps
//! a folder of save/YAML pairs consistent: whichever side was modified last
//! wins, unreadable saves are backed up instead of being lost, and cache mode
//! holds a folder open while another program edits it.

pub mod cli;
pub mod codec;
pub mod config;
pub mod daemon;
pub mod error;
pub mod logging;
pub mod signal;
pub mod sync;

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result};

use crate::cli::{CacheArgs, Cli, Commands, ConvertArgs, SyncArgs};
use crate::codec::{Codec, SaveCodec, UserKey};
use crate::config::Config;
use crate::daemon::{CacheDaemon, DaemonConfig};
use crate::error::ExitCode;
use crate::signal::ShutdownHandler;
use crate::sync::atomic::write_atomic;
use crate::sync::SyncEngine;

/// Run the application for parsed command-line arguments.
///
/// # Errors
///
/// Returns an error for invalid user ids, unreadable inputs, missing
/// folders, failed conversions, and cache mode protocol failures.
pub fn run_app(cli: Cli) -> Result<ExitCode> {
    logging::init_logging(cli.verbose, cli.quiet, cli.no_color);

    let shutdown = match signal::install_handler() {
        Ok(handler) => handler,
        Err(e) => {
            log::warn!("{e}; Ctrl+C will terminate immediately");
            ShutdownHandler::new()
        }
    };

    match cli.command {
        Commands::Encode(args) => convert(&args, Direction::Encode),
        Commands::Decode(args) => convert(&args, Direction::Decode),
        Commands::Sync(args) => run_sync(&args, &shutdown),
        Commands::Cache(args) => run_cache(&args, &shutdown),
    }
}

#[derive(Debug, Clone, Copy)]
enum Direction {
    Encode,
    Decode,
}

fn parse_key(user_id: &str) -> Result<UserKey> {
    UserKey::from_user_id(user_id).with_context(|| format!("Invalid user id: {user_id}"))
}

fn convert(args: &ConvertArgs, direction: Direction) -> Result<ExitCode> {
    let key = parse_key(&args.user_id)?;
    let codec = SaveCodec::new();

    let input = fs::read(&args.input)
        .with_context(|| format!("Failed to read input: {}", args.input.display()))?;

    let output = match direction {
        Direction::Decode => codec
            .decode(&input, &key)
            .with_context(|| format!("Failed to decode {}", args.input.display()))?,
        Direction::Encode => codec
            .encode(&input, &key)
            .with_context(|| format!("Failed to encode {}", args.input.display()))?,
    };

    write_atomic(&args.output, &output)
        .with_context(|| format!("Failed to write output: {}", args.output.display()))?;
    log::info!(
        "{:?}d {} -> {}",
        direction,
        args.input.display(),
        args.output.display()
    );
    Ok(ExitCode::Success)
}

fn run_sync(args: &SyncArgs, shutdown: &ShutdownHandler) -> Result<ExitCode> {
    let key = parse_key(&args.user_id)?;
    let engine = SyncEngine::new(SaveCodec::new()).with_shutdown_flag(shutdown.get_flag());

    let report = engine
        .run_once(&args.folder, &key)
        .with_context(|| format!("Failed to sync {}", args.folder.display()))?;

    if args.json {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
        println!("{json}");
    }

    Ok(if report.has_failures() {
        ExitCode::PartialSuccess
    } else {
        ExitCode::Success
    })
}

fn run_cache(args: &CacheArgs, shutdown: &ShutdownHandler) -> Result<ExitCode> {
    let key = parse_key(&args.user_id)?;
    let config = Config::load().with_overrides(args.timeout, args.paranoid);
    log::debug!("Cache mode config: {:?}", config);

    run_cache_with(&args.folder, &key, &config, shutdown, io::stdin(), &mut io::stdout())
}

/// Cache mode with explicit control input and announcement output.
fn run_cache_with<R, W>(
    folder: &Path,
    key: &UserKey,
    config: &Config,
    shutdown: &ShutdownHandler,
    control: R,
    out: &mut W,
) -> Result<ExitCode>
where
    R: io::Read + Send + 'static,
    W: Write,
{
    let engine = SyncEngine::new(SaveCodec::new()).with_shutdown_flag(shutdown.get_flag());
    let daemon_config = DaemonConfig::default()
        .with_finalize_timeout(config.finalize_timeout())
        .with_paranoid(config.paranoid)
        .with_shutdown(shutdown.clone());

    let report = CacheDaemon::new(engine, daemon_config)
        .run(folder, key, control, out)
        .with_context(|| format!("Cache mode failed for {}", folder.display()))?;

    Ok(if report.has_failures() {
        ExitCode::PartialSuccess
    } else {
        ExitCode::Success
    })
}
