use anyhow::{bail, Context};
use loadout_engine::RestartDecision;
use std::io::{BufRead, Write};
use std::process::Command;
use tracing::info;

/// Asks on the terminal and runs the configured restart/reload commands.
#[derive(Debug, Clone, Default)]
pub struct TerminalSession {
    pub assume_yes: bool,
    pub restart_command: Option<String>,
    pub reload_command: Option<String>,
}

impl TerminalSession {
    pub fn confirm(&self, decision: RestartDecision) -> anyhow::Result<bool> {
        if self.assume_yes {
            return Ok(true);
        }
        let mut stderr = std::io::stderr();
        write!(
            stderr,
            "Applying this profile needs an editor {decision}. Continue? [y/N] "
        )?;
        stderr.flush()?;
        let mut answer = String::new();
        std::io::stdin().lock().read_line(&mut answer)?;
        Ok(is_yes(&answer))
    }

    pub fn restart(&self) -> anyhow::Result<()> {
        match &self.restart_command {
            Some(cmd) => run_shell(cmd),
            None => {
                println!("Restart the editor to finish applying the profile.");
                Ok(())
            }
        }
    }

    pub fn reload(&self) -> anyhow::Result<()> {
        match &self.reload_command {
            Some(cmd) => run_shell(cmd),
            None => {
                println!("Reload the editor window to pick up extension changes.");
                Ok(())
            }
        }
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

fn run_shell(cmd: &str) -> anyhow::Result<()> {
    info!(command = cmd, "running session command");
    let status = if cfg!(windows) {
        Command::new("cmd").args(["/C", cmd]).status()
    } else {
        Command::new("sh").args(["-c", cmd]).status()
    }
    .with_context(|| format!("failed to run `{cmd}`"))?;
    if !status.success() {
        bail!("`{cmd}` exited with {status}");
    }
    Ok(())
}
