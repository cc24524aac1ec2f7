use crate::paths::{ProfilePaths, RepoPaths};
use loadout_core::{
    ExtensionList, ProfileDoc, ProfileError, SnippetsDiff, SyncSettingsDoc, UiStateDiff,
    UiStateMap,
};
use loadout_store::{read_yaml, remove_file_if_exists, write_yaml};
use std::path::PathBuf;
use tracing::debug;

/// A profile repository rooted at a directory containing `profiles/`.
#[derive(Debug, Clone)]
pub struct Repository {
    pub paths: RepoPaths,
}

fn validate_profile_name(name: &str) -> Result<(), ProfileError> {
    let valid = !name.is_empty()
        && name.len() <= 64
        && name != "."
        && name != ".."
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(ProfileError::InvalidProfileName(name.to_string()))
    }
}

impl Repository {
    /// Create the repository layout (idempotent) and open it.
    pub fn init(repo_root: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let paths = RepoPaths::discover(repo_root);
        paths.ensure_layout()?;
        Ok(Self { paths })
    }

    /// Open an existing repository. Fails if `profiles/` does not exist.
    pub fn open(repo_root: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let paths = RepoPaths::discover(repo_root);
        if !paths.is_initialized() {
            return Err(ProfileError::NotInitialized(paths.root).into());
        }
        Ok(Self { paths })
    }

    pub fn profile(&self, name: &str) -> ProfilePaths {
        self.paths.profile(name)
    }

    pub fn profile_exists(&self, name: &str) -> bool {
        self.profile(name).profile_yml.is_file()
    }

    /// Load `profile.yml`. A missing document is a fatal configuration error.
    pub fn load_profile(&self, name: &str) -> anyhow::Result<ProfileDoc> {
        validate_profile_name(name)?;
        let paths = self.profile(name);
        if !paths.profile_yml.is_file() {
            return Err(ProfileError::ProfileNotFound(name.to_string()).into());
        }
        Ok(read_yaml(&paths.profile_yml)?.unwrap_or_default())
    }

    /// Create a new profile, optionally inheriting from `extends`.
    ///
    /// A non-inheriting profile also gets an empty `.sync.yml` so every
    /// inheritance chain ends in a sync policy document.
    pub fn create_profile(&self, name: &str, extends: Option<&str>) -> anyhow::Result<()> {
        validate_profile_name(name)?;
        if self.profile_exists(name) {
            return Err(ProfileError::ProfileExists(name.to_string()).into());
        }
        if let Some(parent) = extends {
            if !self.profile_exists(parent) {
                return Err(ProfileError::ProfileNotFound(parent.to_string()).into());
            }
        }

        let paths = self.profile(name);
        std::fs::create_dir_all(&paths.data_dir)?;
        let doc = ProfileDoc {
            extends: extends.map(str::to_string),
        };
        write_yaml(&paths.profile_yml, &doc, false)?;
        if extends.is_none() {
            write_yaml(&paths.sync_yml, &SyncSettingsDoc::default(), false)?;
        }
        debug!(profile = name, extends = ?extends, "profile created");
        Ok(())
    }

    /// Names of all profiles, sorted.
    pub fn list_profiles(&self) -> anyhow::Result<Vec<String>> {
        let mut names = Vec::new();
        if !self.paths.profiles_dir.is_dir() {
            return Ok(names);
        }
        for entry in std::fs::read_dir(&self.paths.profiles_dir)? {
            let entry = entry?;
            if entry.path().join("profile.yml").is_file() {
                names.push(entry.file_name().to_string_lossy().to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    // ── Per-profile documents ──

    pub fn read_sync_settings_doc(&self, name: &str) -> anyhow::Result<Option<SyncSettingsDoc>> {
        match self.profile(name).existing_sync_yml() {
            Some(path) => read_yaml(path),
            None => Ok(None),
        }
    }

    pub fn write_sync_settings_doc(&self, name: &str, doc: &SyncSettingsDoc) -> anyhow::Result<()> {
        let paths = self.profile(name);
        write_yaml(&paths.sync_yml, doc, false)?;
        remove_file_if_exists(&paths.legacy_sync_yml)?;
        Ok(())
    }

    pub fn remove_sync_settings_doc(&self, name: &str) -> anyhow::Result<bool> {
        let paths = self.profile(name);
        let current = remove_file_if_exists(&paths.sync_yml)?;
        let legacy = remove_file_if_exists(&paths.legacy_sync_yml)?;
        Ok(current || legacy)
    }

    pub fn read_extensions(&self, name: &str) -> anyhow::Result<Option<ExtensionList>> {
        match self.profile(name).existing_extensions_yml() {
            Some(path) => read_yaml(path),
            None => Ok(None),
        }
    }

    pub fn write_extensions(&self, name: &str, list: &ExtensionList) -> anyhow::Result<()> {
        let paths = self.profile(name);
        write_yaml(&paths.extensions_yml, list, false)?;
        remove_file_if_exists(&paths.legacy_extensions_yml)?;
        Ok(())
    }

    pub fn read_snippets_diff(&self, name: &str) -> anyhow::Result<SnippetsDiff> {
        Ok(read_yaml(&self.profile(name).snippets_diff_yml)?.unwrap_or_default())
    }

    /// Write the diff, or delete the document when the diff is empty.
    pub fn store_snippets_diff(&self, name: &str, diff: &SnippetsDiff) -> anyhow::Result<()> {
        let path = self.profile(name).snippets_diff_yml;
        if diff.is_empty() {
            remove_file_if_exists(&path)?;
        } else {
            write_yaml(&path, diff, false)?;
        }
        Ok(())
    }

    pub fn read_ui_state(&self, name: &str) -> anyhow::Result<Option<UiStateMap>> {
        read_yaml(&self.profile(name).ui_state_yml)
    }

    pub fn write_ui_state(&self, name: &str, state: &UiStateMap) -> anyhow::Result<()> {
        write_yaml(&self.profile(name).ui_state_yml, state, true)
    }

    pub fn read_ui_state_diff(&self, name: &str) -> anyhow::Result<UiStateDiff> {
        Ok(read_yaml(&self.profile(name).ui_state_diff_yml)?.unwrap_or_default())
    }

    /// Write the diff owner-only, or delete the document when the diff is empty.
    pub fn store_ui_state_diff(&self, name: &str, diff: &UiStateDiff) -> anyhow::Result<()> {
        let path = self.profile(name).ui_state_diff_yml;
        if diff.is_empty() {
            remove_file_if_exists(&path)?;
        } else {
            write_yaml(&path, diff, true)?;
        }
        Ok(())
    }
}
