use loadout_core::Platform;
use std::path::{Path, PathBuf};

/// Well-known paths under a repository root.
#[derive(Debug, Clone)]
pub struct RepoPaths {
    pub root: PathBuf,
    pub profiles_dir: PathBuf,
    pub config_yml: PathBuf,
}

impl RepoPaths {
    /// Derive all paths from a repo root. Pure computation, no I/O.
    pub fn discover(repo_root: impl Into<PathBuf>) -> Self {
        let root = repo_root.into();
        Self {
            profiles_dir: root.join("profiles"),
            config_yml: root.join("loadout.yml"),
            root,
        }
    }

    /// Create the directory layout. Idempotent.
    pub fn ensure_layout(&self) -> anyhow::Result<()> {
        std::fs::create_dir_all(&self.profiles_dir)?;
        Ok(())
    }

    /// Check whether `profiles/` exists.
    pub fn is_initialized(&self) -> bool {
        self.profiles_dir.is_dir()
    }

    pub fn profile(&self, name: &str) -> ProfilePaths {
        ProfilePaths::new(self.profiles_dir.join(name))
    }
}

/// Documents owned by one profile directory.
#[derive(Debug, Clone)]
pub struct ProfilePaths {
    pub dir: PathBuf,
    pub profile_yml: PathBuf,
    pub sync_yml: PathBuf,
    pub legacy_sync_yml: PathBuf,
    pub data_dir: PathBuf,
    pub extensions_yml: PathBuf,
    pub legacy_extensions_yml: PathBuf,
    pub settings_json: PathBuf,
    pub ui_state_yml: PathBuf,
    pub ui_state_diff_yml: PathBuf,
    pub snippets_dir: PathBuf,
    pub snippets_diff_yml: PathBuf,
}

impl ProfilePaths {
    fn new(dir: PathBuf) -> Self {
        let data_dir = dir.join("data");
        Self {
            profile_yml: dir.join("profile.yml"),
            sync_yml: dir.join(".sync.yml"),
            legacy_sync_yml: dir.join("config.yml"),
            legacy_extensions_yml: dir.join("extensions.yml"),
            extensions_yml: data_dir.join("extensions.yml"),
            settings_json: data_dir.join("settings.json"),
            ui_state_yml: data_dir.join("ui-state.yml"),
            ui_state_diff_yml: data_dir.join("ui-state.diff.yml"),
            snippets_dir: data_dir.join("snippets"),
            snippets_diff_yml: data_dir.join("snippets.diff.yml"),
            data_dir,
            dir,
        }
    }

    /// `keybindings-<platform>.json` when per-platform, else `keybindings.json`.
    pub fn keybindings_json(&self, per_platform: Option<Platform>) -> PathBuf {
        match per_platform {
            Some(p) => self.data_dir.join(format!("keybindings-{p}.json")),
            None => self.data_dir.join("keybindings.json"),
        }
    }

    /// Current path if present, else the legacy one if present.
    pub fn existing_sync_yml(&self) -> Option<&Path> {
        first_existing(&self.sync_yml, &self.legacy_sync_yml)
    }

    pub fn existing_extensions_yml(&self) -> Option<&Path> {
        first_existing(&self.extensions_yml, &self.legacy_extensions_yml)
    }
}

fn first_existing<'a>(current: &'a Path, legacy: &'a Path) -> Option<&'a Path> {
    if current.exists() {
        Some(current)
    } else if legacy.exists() {
        Some(legacy)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discover_builds_correct_paths() {
        let p = RepoPaths::discover("/tmp/repo");
        assert_eq!(p.profiles_dir, PathBuf::from("/tmp/repo/profiles"));
        assert_eq!(p.config_yml, PathBuf::from("/tmp/repo/loadout.yml"));

        let work = p.profile("work");
        assert_eq!(work.profile_yml, PathBuf::from("/tmp/repo/profiles/work/profile.yml"));
        assert_eq!(work.sync_yml, PathBuf::from("/tmp/repo/profiles/work/.sync.yml"));
        assert_eq!(
            work.extensions_yml,
            PathBuf::from("/tmp/repo/profiles/work/data/extensions.yml")
        );
        assert_eq!(
            work.snippets_diff_yml,
            PathBuf::from("/tmp/repo/profiles/work/data/snippets.diff.yml")
        );
        assert_eq!(
            work.keybindings_json(Some(Platform::Macos)),
            PathBuf::from("/tmp/repo/profiles/work/data/keybindings-macos.json")
        );
        assert_eq!(
            work.keybindings_json(None),
            PathBuf::from("/tmp/repo/profiles/work/data/keybindings.json")
        );
    }

    #[test]
    fn legacy_paths_are_used_only_as_fallback() {
        let tmp = tempfile::tempdir().unwrap();
        let p = RepoPaths::discover(tmp.path()).profile("base");
        std::fs::create_dir_all(&p.data_dir).unwrap();
        assert!(p.existing_sync_yml().is_none());

        std::fs::write(&p.legacy_sync_yml, "{}").unwrap();
        assert_eq!(p.existing_sync_yml(), Some(p.legacy_sync_yml.as_path()));

        std::fs::write(&p.sync_yml, "{}").unwrap();
        assert_eq!(p.existing_sync_yml(), Some(p.sync_yml.as_path()));
    }
}
