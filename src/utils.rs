//! Utility functions for store operations.

use crate::error::Result;
use colored::*;
use indicatif::ProgressBar;
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::time::Duration;

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

/// Check file permissions and return warnings.
pub fn check_file_permissions(path: &Path) -> Vec<String> {
    let mut warnings = Vec::new();

    #[cfg(unix)]
    {
        if let Ok(metadata) = fs::metadata(path) {
            let mode = metadata.permissions().mode();

            // Group or others have any permissions
            if mode & 0o077 != 0 {
                warnings.push(format!(
                    "File has insecure permissions: {:o}. Run 'chmod 600 {}' to fix.",
                    mode & 0o777,
                    path.display()
                ));
            }
        }
    }

    warnings
}

/// Check if running with appropriate privileges.
pub fn check_process_privileges() -> Vec<String> {
    let mut warnings = Vec::new();

    #[cfg(unix)]
    {
        if unsafe { libc::geteuid() } == 0 {
            warnings.push("Running as root is not recommended".to_string());
        }
    }

    warnings
}

/// Replace `path` with `data` without ever leaving a half-written file.
///
/// The data goes to a 0600 temp file in the same directory which is then
/// renamed over the target. On error the original file is untouched.
pub fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut temp = tempfile::Builder::new()
        .prefix(".linevault-")
        .suffix(".tmp")
        .tempfile_in(dir)?;

    #[cfg(unix)]
    fs::set_permissions(temp.path(), fs::Permissions::from_mode(0o600))?;

    temp.write_all(data)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Run `work` behind a spinner when stderr is a terminal.
pub fn with_spinner<T>(message: &str, work: impl FnOnce() -> T) -> T {
    if !atty::is(atty::Stream::Stderr) {
        return work();
    }

    let spinner = ProgressBar::new_spinner();
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(100));
    let result = work();
    spinner.finish_and_clear();
    result
}

/// Print an error message and exit.
pub fn error_exit(message: &str, code: i32) -> ! {
    eprintln!("{} {}", "Error:".red().bold(), message);
    std::process::exit(code);
}

/// Print a success message.
pub fn success(out: &mut dyn Write, message: &str) -> io::Result<()> {
    writeln!(out, "{} {}", "✓".green(), message)
}

/// Print a warning message.
pub fn warning(out: &mut dyn Write, message: &str) -> io::Result<()> {
    writeln!(out, "{} {}", "Warning:".yellow(), message)
}

/// Print a recoverable error.
pub fn failure(out: &mut dyn Write, message: &str) -> io::Result<()> {
    writeln!(out, "{} {}", "Error:".red(), message)
}

/// Clear the terminal screen.
pub fn clear_screen(out: &mut dyn Write) -> io::Result<()> {
    write!(out, "\x1B[2J\x1B[1;1H")?;
    out.flush()
}
