use loadout_core::{KeyMatcher, Platform, SyncSettings};
use loadout_profile::{load_sync_settings, ProfileChain, ProfilePaths, Repository};
use std::path::PathBuf;

/// Where the editor on this machine keeps its user files.
#[derive(Debug, Clone)]
pub struct LiveEnvironment {
    /// Directory holding `settings.json`, `keybindings.json` and `snippets/`.
    pub user_dir: PathBuf,
    /// Extension data directory; redacted from stored UI state.
    pub extensions_dir: PathBuf,
    /// UI-state values under the home directory are never stored.
    pub home_dir: Option<PathBuf>,
    pub platform: Platform,
}

impl LiveEnvironment {
    pub fn new(user_dir: impl Into<PathBuf>, extensions_dir: impl Into<PathBuf>) -> Self {
        Self {
            user_dir: user_dir.into(),
            extensions_dir: extensions_dir.into(),
            home_dir: dirs::home_dir(),
            platform: Platform::current(),
        }
    }

    pub fn settings_json(&self) -> PathBuf {
        self.user_dir.join("settings.json")
    }

    pub fn keybindings_json(&self) -> PathBuf {
        self.user_dir.join("keybindings.json")
    }

    pub fn snippets_dir(&self) -> PathBuf {
        self.user_dir.join("snippets")
    }
}

/// A resolved profile: its chain, its sync policy, and the live machine.
///
/// Every operation receives one of these explicitly.
pub struct ProfileContext<'a> {
    pub repo: &'a Repository,
    pub live: &'a LiveEnvironment,
    pub chain: ProfileChain,
    pub settings: SyncSettings,
}

impl<'a> ProfileContext<'a> {
    /// Resolve `name`. Fails before any editor I/O when the profile or
    /// any ancestor is missing, the chain is cyclic, or no sync settings
    /// document exists on the chain.
    pub fn load(repo: &'a Repository, live: &'a LiveEnvironment, name: &str) -> anyhow::Result<Self> {
        let chain = ProfileChain::resolve(repo, name)?;
        let settings = load_sync_settings(repo, &chain)?;
        Ok(Self {
            repo,
            live,
            chain,
            settings,
        })
    }

    pub fn leaf(&self) -> &str {
        self.chain.leaf()
    }

    pub fn root_paths(&self) -> ProfilePaths {
        self.repo.profile(self.chain.root())
    }

    pub fn ignored_extensions(&self) -> anyhow::Result<KeyMatcher> {
        KeyMatcher::case_insensitive(&self.settings.ignored_extensions)
    }

    pub fn ignored_settings(&self) -> anyhow::Result<KeyMatcher> {
        KeyMatcher::new(&self.settings.effective_ignored_settings())
    }

    /// Stored key-bindings file name for this machine.
    pub fn stored_keybindings(&self) -> PathBuf {
        let platform = self
            .settings
            .keybindings_per_platform
            .then_some(self.live.platform);
        self.root_paths().keybindings_json(platform)
    }
}
