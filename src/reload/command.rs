//! Shell command run alongside each reload.

use tokio::process::Command;
use tokio::task::JoinHandle;

/// Build a command that runs `line` through the platform shell.
fn shell(line: &str) -> Command {
    #[cfg(windows)]
    let mut command = {
        let mut command = Command::new("cmd");
        command.arg("/C");
        command
    };
    #[cfg(not(windows))]
    let mut command = {
        let mut command = Command::new("sh");
        command.arg("-c");
        command
    };
    command.arg(line);
    command
}

/// Run `line` in the background with inherited stdio.
///
/// Fire-and-forget: the outcome is only logged. The returned handle resolves
/// to whether the command exited successfully.
pub fn spawn_command(line: &str) -> JoinHandle<bool> {
    let line = line.to_owned();
    tokio::spawn(async move {
        tracing::info!(command = %line, "Running reload command");
        match shell(&line).status().await {
            Ok(status) if status.success() => {
                tracing::debug!(command = %line, "Reload command finished");
                true
            }
            Ok(status) => {
                tracing::warn!(command = %line, %status, "Reload command failed");
                false
            }
            Err(e) => {
                tracing::error!(command = %line, error = %e, "Failed to start reload command");
                false
            }
        }
    })
}
