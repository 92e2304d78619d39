//! Templater CLI
//!
//! Usage: templater <COMMAND>
//!
//! Commands:
//!   render   Render one template
//!   batch    Render many templates concurrently
//!   watch    Re-render on change
//!   keys     List referenced data keys
//!   check    Validate a template and its data
//!   diff     Preview changes to an existing output
//!   restore  Restore an output from backup

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::cli::{Cli, Commands};
use crate::commands::Context;

/// Log level: `-v` forces debug, else `RUST_LOG`, else info
///
/// Logs go to stderr so rendered output and `--json` lines own stdout.
fn init_tracing(verbose: u8) {
    let filter = if verbose > 0 {
        EnvFilter::new("templater=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("templater=info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    tracing::debug!("templater starting with args: {:?}", cli);

    let ctx = Context::load(cli.config.as_deref(), cli.json)?;

    match cli.command {
        Commands::Render {
            template,
            data,
            output,
            validate,
            document,
        } => commands::render::cmd_render(&ctx, &template, &data, output.as_deref(), validate, document),
        Commands::Batch {
            paths,
            data,
            output,
            workers,
        } => commands::batch::cmd_batch(&ctx, &paths, &data, output, workers),
        Commands::Watch {
            template,
            output,
            data,
            interval,
        } => commands::watch::cmd_watch(&ctx, &template, &output, data, interval),
        Commands::Keys { template } => commands::inspect::cmd_keys(&ctx, &template),
        Commands::Check { template, data } => commands::inspect::cmd_check(&ctx, &template, &data),
        Commands::Diff {
            template,
            output,
            data,
        } => commands::diff::cmd_diff(&ctx, &template, &output, &data),
        Commands::Restore { output, list } => commands::restore::cmd_restore(&ctx, &output, list),
    }
}
