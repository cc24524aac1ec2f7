use anyhow::{bail, Context};
use loadout_core::ExtensionId;
use std::process::Command;
use tracing::debug;

/// The editor's command-line interface (`code --list-extensions`, ...).
#[derive(Debug, Clone)]
pub struct CodeCli {
    bin: String,
}

impl CodeCli {
    pub fn new(bin: impl Into<String>) -> Self {
        Self { bin: bin.into() }
    }

    fn run(&self, args: &[&str]) -> anyhow::Result<String> {
        debug!(bin = %self.bin, ?args, "running editor cli");
        let output = Command::new(&self.bin)
            .args(args)
            .output()
            .with_context(|| format!("failed to run {}", self.bin))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("{} {} failed: {}", self.bin, args.join(" "), stderr.trim());
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    pub fn list_installed(&self) -> anyhow::Result<Vec<ExtensionId>> {
        Ok(parse_extension_list(&self.run(&["--list-extensions"])?))
    }

    pub fn install(&self, ext: &ExtensionId) -> anyhow::Result<()> {
        self.run(&["--install-extension", &ext.id, "--force"])?;
        Ok(())
    }

    pub fn uninstall(&self, ext: &ExtensionId) -> anyhow::Result<()> {
        self.run(&["--uninstall-extension", &ext.id])?;
        Ok(())
    }
}

/// One `publisher.name` per line; anything else (banners, warnings) is skipped.
fn parse_extension_list(stdout: &str) -> Vec<ExtensionId> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.contains(' ') && line.contains('.'))
        .map(|line| match line.split_once('@') {
            Some((id, _version)) => ExtensionId::new(id),
            None => ExtensionId::new(line),
        })
        .collect()
}
