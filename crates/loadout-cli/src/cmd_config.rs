use crate::config::{HostConfig, KEYS};
use clap::Subcommand;
use loadout_profile::RepoPaths;
use std::path::Path;

// ── CLI Schema ──

#[derive(Subcommand)]
pub enum ConfigCmd {
    /// Set a config value (an empty value restores the default)
    Set {
        /// Config key (e.g. editor_bin)
        key: String,
        /// Config value
        value: String,
    },
    /// Get a config value
    Get {
        /// Config key
        key: String,
        /// Show the value in effect, including defaults
        #[arg(long)]
        resolved: bool,
    },
    /// List all config values
    List,
}

// ── Dispatch ──

pub fn run(cmd: ConfigCmd, repo_root: &Path) -> anyhow::Result<()> {
    match cmd {
        ConfigCmd::Set { key, value } => set(repo_root, &key, &value),
        ConfigCmd::Get { key, resolved } => get(repo_root, &key, resolved),
        ConfigCmd::List => list(repo_root),
    }
}

// ── Command Implementations ──

fn config_path(repo_root: &Path) -> anyhow::Result<std::path::PathBuf> {
    let paths = RepoPaths::discover(repo_root);
    if !paths.is_initialized() {
        anyhow::bail!("No profile repository at {}. Run `loadout init` first.", paths.root.display());
    }
    Ok(paths.config_yml)
}

/// `loadout config set <key> <value>`
pub fn set(repo_root: &Path, key: &str, value: &str) -> anyhow::Result<()> {
    let path = config_path(repo_root)?;
    let mut config = HostConfig::load(&path)?;
    config.set(key, value)?;
    config.save(&path)?;
    if value.is_empty() {
        println!("{key} cleared");
    } else {
        println!("{key} = {value}");
    }
    Ok(())
}

/// `loadout config get <key>`
pub fn get(repo_root: &Path, key: &str, resolved: bool) -> anyhow::Result<()> {
    let config = HostConfig::load(&config_path(repo_root)?)?;
    let value = if resolved { config.resolved(key)? } else { config.get(key)? };
    match value {
        Some(val) => println!("{val}"),
        None => println!("(not set)"),
    }
    Ok(())
}

/// `loadout config list`
pub fn list(repo_root: &Path) -> anyhow::Result<()> {
    let config = HostConfig::load(&config_path(repo_root)?)?;
    for key in KEYS {
        match config.get(key)? {
            Some(val) => println!("{key} = {val}"),
            None => match config.resolved(key) {
                Ok(Some(val)) => println!("{key} = {val} (default)"),
                _ => println!("{key} = (not set)"),
            },
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_requires_init() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(set(tmp.path(), "editor_bin", "codium").is_err());
    }

    #[test]
    fn set_get_and_clear() {
        let tmp = tempfile::tempdir().unwrap();
        crate::cmd_init::execute(tmp.path()).unwrap();
        let path = tmp.path().join("loadout.yml");

        set(tmp.path(), "editor_bin", "codium").unwrap();
        assert_eq!(HostConfig::load(&path).unwrap().editor_bin.as_deref(), Some("codium"));
        get(tmp.path(), "editor_bin", false).unwrap();
        list(tmp.path()).unwrap();

        set(tmp.path(), "editor_bin", "").unwrap();
        assert_eq!(HostConfig::load(&path).unwrap().editor_bin, None);

        assert!(set(tmp.path(), "no_such_key", "x").is_err());
        assert!(get(tmp.path(), "no_such_key", false).is_err());
    }
}
