use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "asgsync")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(
    about = "Reconcile Cloud Foundry application security groups against declared state",
    long_about = None
)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file (default: ~/.config/asgsync/config.toml)
    #[arg(long, global = true, env = "ASGSYNC_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Compare declared security groups with the platform and report (or apply) the difference
    Reconcile(ReconcileArgs),

    /// Check the rules of every security group against network policy
    Scan(ScanArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Options shared by commands that talk to the platform
#[derive(Args, Clone, Default)]
pub struct PlatformArgs {
    /// Disable TLS certificate verification
    #[arg(long)]
    pub skip_ssl_validation: bool,

    /// Log intermediate sets and timings (same as -vv)
    #[arg(short = 'D', long)]
    pub debug: bool,
}

#[derive(Args)]
pub struct ReconcileArgs {
    /// YAML files or directories of declared groups ("-" for stdin)
    #[arg(value_name = "FILES")]
    pub inputs: Vec<PathBuf>,

    /// Apply the changes instead of only reporting them
    #[arg(short = 'd', long, visible_alias = "delete")]
    pub apply: bool,

    /// Print the report as JSON
    #[arg(short, long)]
    pub json: bool,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,

    /// Fail if a group is declared more than once
    #[arg(long)]
    pub strict: bool,

    #[command(flatten)]
    pub platform: PlatformArgs,
}

#[derive(Args)]
pub struct ScanArgs {
    /// Regular expression for group names to skip (repeatable)
    #[arg(short = 's', long = "skip-re", value_name = "REGEX")]
    pub skip_re: Vec<String>,

    /// Group name to skip (repeatable)
    #[arg(short = 'S', long = "skip", value_name = "NAME")]
    pub skip: Vec<String>,

    /// Network no rule may reach: address, CIDR or range (repeatable)
    #[arg(short = 'n', long = "network", value_name = "NET")]
    pub networks: Vec<String>,

    /// Minimum prefix length of a destination [default: 22]
    #[arg(short = 'm', long, value_name = "LEN", value_parser = clap::value_parser!(u8).range(0..=32))]
    pub min_cidr: Option<u8>,

    /// Print the result as JSON
    #[arg(short, long)]
    pub json: bool,

    #[command(flatten)]
    pub platform: PlatformArgs,
}
