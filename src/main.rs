//! Main entry point for linevault.

use anyhow::Context;
use clap::Parser;
use linevault::cli::{init_logging, Cli};
use linevault::utils::error_exit;

fn main() {
    // Set up colored output for Windows
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(&cli) {
        error_exit(&format!("{e:#}"), 1);
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    cli.execute()
        .with_context(|| format!("store {}", cli.file.display()))
}
