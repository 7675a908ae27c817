//! Interactive hand-off to the sqlite3 shell.

use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::Result;
use tracing::debug;

const SHELL: &str = "sqlite3";

/// Replace this process with `sqlite3 <database>` when attached to a terminal
/// and `sqlite3` is installed. Returns `Ok(())` when no hand-off happens.
///
/// The database must be closed before calling this.
pub fn open_shell(database: &Path) -> Result<()> {
    if !(std::io::stdin().is_terminal() && std::io::stdout().is_terminal()) {
        debug!("Not a terminal, skipping {}", SHELL);
        return Ok(());
    }
    let Some(shell) = find_in_path(SHELL) else {
        debug!("{} not found in PATH", SHELL);
        return Ok(());
    };

    let mut cmd = Command::new(shell);
    cmd.arg(database);
    run(cmd)
}

#[cfg(unix)]
fn run(mut cmd: Command) -> Result<()> {
    use std::os::unix::process::CommandExt;
    // exec only returns on failure
    Err(cmd.exec().into())
}

#[cfg(not(unix))]
fn run(mut cmd: Command) -> Result<()> {
    let status = cmd.status()?;
    anyhow::ensure!(status.success(), "{} exited with {}", SHELL, status);
    Ok(())
}

fn find_in_path(program: &str) -> Option<PathBuf> {
    let path = std::env::var_os("PATH")?;
    std::env::split_paths(&path)
        .map(|dir| dir.join(program))
        .find(|candidate| candidate.is_file())
}
