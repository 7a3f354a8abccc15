//! Command-line interface definitions.
//!
//! One single-letter subcommand per mode, each taking the user id first:
//!
//! ```bash
//! # Decode a save to YAML, and encode it back
//! bl4_auto_crypter d 76561198000000000 "1.sav" "1.yaml"
//! bl4_auto_crypter e 76561198000000000 "1.yaml" "1.sav"
//!
//! # Sync a whole save folder once
//! bl4_auto_crypter s 76561198000000000 ~/saves
//!
//! # Cache mode: sync, wait for "g" on stdin, sync what changed, exit
//! bl4_auto_crypter S 76561198000000000 ~/saves
//! ```

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Convert save files to and from editable YAML and keep folders in sync.
#[derive(Debug, Parser)]
#[command(name = "bl4_auto_crypter")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Report fatal errors as JSON on stderr
    #[arg(long, global = true)]
    pub json_errors: bool,

    /// Mode to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Available modes.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Encode a YAML file into a save file
    #[command(name = "e", visible_alias = "encode")]
    Encode(ConvertArgs),
    /// Decode a save file into a YAML file
    #[command(name = "d", visible_alias = "decode")]
    Decode(ConvertArgs),
    /// Sync every save/YAML pair in a folder once
    #[command(name = "s", visible_alias = "sync")]
    Sync(SyncArgs),
    /// Sync, wait for "g" on stdin, then sync whatever changed meanwhile
    #[command(name = "S", visible_alias = "cache")]
    Cache(CacheArgs),
}

/// Arguments for single file conversion.
#[derive(Debug, Args)]
pub struct ConvertArgs {
    /// Account id the save belongs to (Steam id or Epic account id)
    #[arg(value_name = "USER_ID")]
    pub user_id: String,

    /// File to read
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// File to write
    #[arg(value_name = "OUTPUT")]
    pub output: PathBuf,
}

/// Arguments for a single sync pass.
#[derive(Debug, Args)]
pub struct SyncArgs {
    /// Account id the saves belong to (Steam id or Epic account id)
    #[arg(value_name = "USER_ID")]
    pub user_id: String,

    /// Folder holding the save files
    #[arg(value_name = "FOLDER")]
    pub folder: PathBuf,

    /// Print the sync report as JSON on stdout
    #[arg(long)]
    pub json: bool,
}

/// Arguments for cache mode.
#[derive(Debug, Args)]
pub struct CacheArgs {
    /// Account id the saves belong to (Steam id or Epic account id)
    #[arg(value_name = "USER_ID")]
    pub user_id: String,

    /// Folder holding the save files
    #[arg(value_name = "FOLDER")]
    pub folder: PathBuf,

    /// Give up after waiting this many seconds for the finalize command
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Re-hash every file when looking for changes
    ///
    /// Slower but catches edits that keep the size and modification time.
    #[arg(long)]
    pub paranoid: bool,
}
