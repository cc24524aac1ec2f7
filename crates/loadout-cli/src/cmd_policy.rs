use clap::Subcommand;
use loadout_core::{Resource, SyncSettings};
use loadout_profile::{load_sync_settings, save_sync_settings, ProfileChain, Repository, SyncSettingsSaved};
use std::path::Path;

// ── CLI Schema ──

#[derive(Subcommand)]
pub enum PolicyCmd {
    /// Show the sync policy a profile resolves to
    Show {
        profile: String,
    },
    /// Change one field of a profile's sync policy
    Set {
        profile: String,
        /// keybindings-per-platform | ignored-extensions | ignored-settings | resources
        field: String,
        /// true/false, or a comma-separated list (empty for none)
        value: String,
    },
}

// ── Dispatch ──

pub fn run(cmd: PolicyCmd, repo_root: &Path) -> anyhow::Result<()> {
    match cmd {
        PolicyCmd::Show { profile } => show(repo_root, &profile),
        PolicyCmd::Set { profile, field, value } => set(repo_root, &profile, &field, &value),
    }
}

// ── Command Implementations ──

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn apply_field(settings: &mut SyncSettings, field: &str, value: &str) -> anyhow::Result<()> {
    match field {
        "keybindings-per-platform" => {
            settings.keybindings_per_platform = match value {
                "true" => true,
                "false" => false,
                other => anyhow::bail!("expected true or false, got {other:?}"),
            }
        }
        "ignored-extensions" => settings.ignored_extensions = split_list(value),
        "ignored-settings" => settings.ignored_settings = split_list(value),
        "resources" => {
            settings.resources = split_list(value)
                .iter()
                .map(|s| s.parse::<Resource>().map_err(anyhow::Error::msg))
                .collect::<anyhow::Result<Vec<_>>>()?;
        }
        other => anyhow::bail!(
            "unknown policy field: {other} (known: keybindings-per-platform, ignored-extensions, ignored-settings, resources)"
        ),
    }
    Ok(())
}

/// `loadout policy show <profile>`
pub fn show(repo_root: &Path, profile: &str) -> anyhow::Result<()> {
    let repo = Repository::open(repo_root)?;
    let chain = ProfileChain::resolve(&repo, profile)?;
    let settings = load_sync_settings(&repo, &chain)?;
    println!("# {chain}");
    print!("{}", serde_yaml::to_string(&settings)?);
    Ok(())
}

/// `loadout policy set <profile> <field> <value>`
pub fn set(repo_root: &Path, profile: &str, field: &str, value: &str) -> anyhow::Result<()> {
    let repo = Repository::open(repo_root)?;
    let chain = ProfileChain::resolve(&repo, profile)?;
    let mut settings = load_sync_settings(&repo, &chain)?;
    apply_field(&mut settings, field, value)?;
    match save_sync_settings(&repo, &chain, &settings)? {
        SyncSettingsSaved::Written(doc) => {
            println!("Updated sync policy for {profile}");
            print!("{}", serde_yaml::to_string(&doc)?);
        }
        SyncSettingsSaved::Removed => {
            println!("{profile} now inherits its whole sync policy from {}", chain.parent().unwrap_or("its parent"));
        }
    }
    Ok(())
}
