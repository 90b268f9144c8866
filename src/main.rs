mod cli;
mod commands;
mod config;
mod progress;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use config::AppConfig;
use std::io;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
    pub config: AppConfig,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let debug = match &cli.command {
        Command::Reconcile(args) => args.platform.debug,
        Command::Scan(args) => args.platform.debug,
        Command::Completions { .. } => false,
    };

    // Initialize logging based on verbosity
    let log_level = match (cli.verbose, debug) {
        (0, false) => log::LevelFilter::Warn,
        (1, false) => log::LevelFilter::Info,
        (0..=2, _) => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    if let Command::Completions { shell } = cli.command {
        generate(shell, &mut Cli::command(), "asgsync", &mut io::stdout());
        return Ok(());
    }

    let ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
        config: AppConfig::load(cli.config.as_deref())?,
    };
    log::trace!("verbosity {}, config {:?}", ctx.verbose, ctx.config);

    match cli.command {
        Command::Reconcile(args) => commands::reconcile::run(&ctx, args),
        Command::Scan(args) => commands::scan::run(&ctx, args),
        Command::Completions { .. } => Ok(()),
    }
}
