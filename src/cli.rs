//! Command-line interface implementation.

use crate::config::KdfParams;
use crate::error::Result;
use crate::interactive::Shell;
use crate::session::Session;
use crate::terminal::{Console, Terminal};
use crate::utils;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Environment variable holding a tracing filter, e.g. `linevault=debug`.
pub const LOG_ENV: &str = "LINEVAULT_LOG";

/// Passphrase-protected line store with an interactive shell.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the store file (a new store is started if it does not exist)
    #[arg(env = "LINEVAULT_FILE", value_name = "FILE")]
    pub file: PathBuf,

    /// Enable debug logging on stderr
    #[arg(short, long)]
    pub verbose: bool,

    /// Argon2 memory cost in KiB for new keys
    #[arg(long, value_name = "KIB", default_value_t = 65536)]
    pub kdf_memory: u32,

    /// Argon2 iterations for new keys
    #[arg(long, value_name = "N", default_value_t = 3)]
    pub kdf_iterations: u32,

    /// Argon2 parallelism for new keys
    #[arg(long, value_name = "N", default_value_t = 1)]
    pub kdf_parallelism: u32,
}

impl Cli {
    /// Work factors used when a key is created (new store or `change`).
    pub fn kdf_params(&self) -> Result<KdfParams> {
        KdfParams::new(self.kdf_memory, self.kdf_iterations, self.kdf_parallelism)
    }

    /// Open the store and run the shell until the user quits.
    pub fn execute(&self) -> Result<()> {
        let params = self.kdf_params()?;
        let mut console = Console::new()?;

        for warn in utils::check_process_privileges() {
            utils::warning(console.out(), &warn)?;
        }

        let mut session = Session::open(&self.file, params, &mut console)?;
        Shell::new(&mut session, &mut console).run()
    }
}

/// Install the stderr log subscriber.
///
/// `LINEVAULT_LOG` wins over `--verbose`; the default only shows warnings.
pub fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("warn")
        }
    });

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
