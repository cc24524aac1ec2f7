//! Host configuration stored in `<repo>/loadout.yml`.

use anyhow::Context;
use loadout_core::Platform;
use loadout_engine::LiveEnvironment;
use loadout_store::{read_yaml, write_yaml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Where the editor lives on this machine. Every field is optional and
/// falls back to the stock editor layout.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HostConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub editor_bin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_data_dir: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions_dir: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_db: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<Platform>,
    /// Shell command that restarts the editor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restart_command: Option<String>,
    /// Shell command that reloads the editor window.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reload_command: Option<String>,
}

pub const KEYS: &[&str] = &[
    "editor_bin",
    "user_data_dir",
    "extensions_dir",
    "state_db",
    "platform",
    "restart_command",
    "reload_command",
];

impl HostConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        Ok(read_yaml(path)?.unwrap_or_default())
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        write_yaml(path, self, false)
    }

    pub fn editor_bin(&self) -> String {
        self.editor_bin.clone().unwrap_or_else(|| "code".to_string())
    }

    pub fn user_data_dir(&self) -> anyhow::Result<PathBuf> {
        if let Some(dir) = &self.user_data_dir {
            return Ok(dir.clone());
        }
        let config = dirs::config_dir().context("cannot locate the user config directory; set user_data_dir")?;
        Ok(config.join("Code").join("User"))
    }

    pub fn extensions_dir(&self) -> anyhow::Result<PathBuf> {
        if let Some(dir) = &self.extensions_dir {
            return Ok(dir.clone());
        }
        let home = dirs::home_dir().context("cannot locate the home directory; set extensions_dir")?;
        Ok(home.join(".vscode").join("extensions"))
    }

    pub fn state_db(&self) -> anyhow::Result<PathBuf> {
        match &self.state_db {
            Some(path) => Ok(path.clone()),
            None => Ok(self.user_data_dir()?.join("globalStorage").join("state.vscdb")),
        }
    }

    pub fn platform(&self) -> Platform {
        self.platform.unwrap_or_else(Platform::current)
    }

    pub fn live_environment(&self) -> anyhow::Result<LiveEnvironment> {
        let mut live = LiveEnvironment::new(self.user_data_dir()?, self.extensions_dir()?);
        live.platform = self.platform();
        Ok(live)
    }

    /// Explicitly set value of `key`, if any.
    pub fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        let path = |p: &Option<PathBuf>| p.as_ref().map(|p| p.display().to_string());
        Ok(match key {
            "editor_bin" => self.editor_bin.clone(),
            "user_data_dir" => path(&self.user_data_dir),
            "extensions_dir" => path(&self.extensions_dir),
            "state_db" => path(&self.state_db),
            "platform" => self.platform.map(|p| p.to_string()),
            "restart_command" => self.restart_command.clone(),
            "reload_command" => self.reload_command.clone(),
            other => anyhow::bail!("unknown config key: {other} (known: {})", KEYS.join(", ")),
        })
    }

    /// Value of `key` after defaults are applied.
    pub fn resolved(&self, key: &str) -> anyhow::Result<Option<String>> {
        let shown = |p: PathBuf| Some(p.display().to_string());
        Ok(match key {
            "editor_bin" => Some(self.editor_bin()),
            "user_data_dir" => shown(self.user_data_dir()?),
            "extensions_dir" => shown(self.extensions_dir()?),
            "state_db" => shown(self.state_db()?),
            "platform" => Some(self.platform().to_string()),
            other => self.get(other)?,
        })
    }

    /// Set `key`; an empty value clears it back to the default.
    pub fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        let text = (!value.is_empty()).then(|| value.to_string());
        let path = text.as_ref().map(PathBuf::from);
        match key {
            "editor_bin" => self.editor_bin = text,
            "user_data_dir" => self.user_data_dir = path,
            "extensions_dir" => self.extensions_dir = path,
            "state_db" => self.state_db = path,
            "platform" => {
                self.platform = match text {
                    Some(t) => Some(t.parse().map_err(anyhow::Error::msg)?),
                    None => None,
                }
            }
            "restart_command" => self.restart_command = text,
            "reload_command" => self.reload_command = text,
            other => anyhow::bail!("unknown config key: {other} (known: {})", KEYS.join(", ")),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_get_and_clear() {
        let mut cfg = HostConfig::default();
        cfg.set("editor_bin", "codium").unwrap();
        cfg.set("platform", "darwin").unwrap();
        assert_eq!(cfg.get("editor_bin").unwrap().as_deref(), Some("codium"));
        assert_eq!(cfg.platform(), Platform::Macos);

        cfg.set("editor_bin", "").unwrap();
        assert_eq!(cfg.get("editor_bin").unwrap(), None);
        assert_eq!(cfg.editor_bin(), "code");
    }

    #[test]
    fn unknown_keys_and_platforms_are_rejected() {
        let mut cfg = HostConfig::default();
        assert!(cfg.set("nope", "x").is_err());
        assert!(cfg.set("platform", "beos").is_err());
        assert!(cfg.get("nope").is_err());
    }

    #[test]
    fn state_db_defaults_under_user_data_dir() {
        let cfg = HostConfig {
            user_data_dir: Some(PathBuf::from("/tmp/user")),
            ..Default::default()
        };
        assert_eq!(
            cfg.state_db().unwrap(),
            PathBuf::from("/tmp/user/globalStorage/state.vscdb")
        );
    }

    #[test]
    fn round_trips_through_yaml() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("loadout.yml");
        assert_eq!(HostConfig::load(&path).unwrap(), HostConfig::default());

        let mut cfg = HostConfig::default();
        cfg.set("restart_command", "pkill code && code").unwrap();
        cfg.save(&path).unwrap();
        assert_eq!(HostConfig::load(&path).unwrap(), cfg);
    }
}
