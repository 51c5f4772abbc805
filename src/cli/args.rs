//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// artcache - local cache for remote artifacts
///
/// Fetches files named by JSON tokens once, stores them content-addressed,
/// and refreshes them when their lifetime runs out.
#[derive(Parser, Debug)]
#[command(name = "artcache")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "ARTCACHE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Cache base directory (overrides cache.dir)
    #[arg(short, long, global = true, env = "ARTCACHE_DIR")]
    pub dir: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Resolve a token to local files, fetching or refreshing as needed
    At(AtArgs),

    /// Fetch and record a token without resolving it
    Register(RegisterArgs),

    /// Refresh a registered token if it has expired
    Check(CheckArgs),

    /// Refresh every expired token
    CheckAll,

    /// List cached tokens
    List(ListArgs),

    /// Show or initialize configuration
    Config(ConfigArgs),
}

/// Arguments for the at command
#[derive(Parser, Debug)]
pub struct AtArgs {
    /// Token JSON, e.g. '{"org":"o","repo":"r","path":"f.txt"}'
    pub token: String,

    /// Lifetime in seconds if the token gets registered
    #[arg(short, long)]
    pub lifetime: Option<u64>,

    /// Copy files out instead of printing blob paths; without names the
    /// default file names are used
    #[arg(long, num_args = 0.., value_name = "NAME")]
    pub save: Option<Vec<PathBuf>>,

    /// Directory relative save names are resolved against
    #[arg(long, requires = "save")]
    pub cwd: Option<PathBuf>,
}

/// Arguments for the register command
#[derive(Parser, Debug)]
pub struct RegisterArgs {
    /// Token JSON
    pub token: String,

    /// Lifetime in seconds (default: cache.default_lifetime_secs)
    #[arg(short, long)]
    pub lifetime: Option<u64>,
}

/// Arguments for the check command
#[derive(Parser, Debug)]
pub struct CheckArgs {
    /// Token JSON
    pub token: String,
}

/// Arguments for the list command
#[derive(Parser, Debug)]
pub struct ListArgs {
    /// Include history records
    #[arg(short, long)]
    pub all: bool,

    /// Output format
    #[arg(short, long, default_value = "table")]
    pub format: OutputFormat,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Subcommand for config
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Initialize default configuration
    Init {
        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },
}

/// Output format for list command
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    Table,
    /// JSON output
    Json,
    /// Simple text (one hash per line)
    Plain,
}
