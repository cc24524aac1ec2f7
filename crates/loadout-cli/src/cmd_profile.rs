use crate::config::HostConfig;
use loadout_engine::{summarize, ProfileContext};
use loadout_profile::Repository;
use std::path::Path;

/// `loadout create <name> [--extends <parent>]`
pub fn create(repo_root: &Path, name: &str, extends: Option<&str>) -> anyhow::Result<()> {
    let repo = Repository::open(repo_root)?;
    repo.create_profile(name, extends)?;
    match extends {
        Some(parent) => println!("Created profile {name} (extends {parent})"),
        None => println!("Created profile {name}"),
    }
    Ok(())
}

/// `loadout list`
pub fn list(repo_root: &Path) -> anyhow::Result<()> {
    let repo = Repository::open(repo_root)?;
    let names = repo.list_profiles()?;
    if names.is_empty() {
        println!("(no profiles)");
        return Ok(());
    }
    for name in names {
        match repo.load_profile(&name)?.extends {
            Some(parent) => println!("{name} -> {parent}"),
            None => println!("{name}"),
        }
    }
    Ok(())
}

/// `loadout show <name>`
pub fn show(repo_root: &Path, name: &str, json: bool) -> anyhow::Result<()> {
    let repo = Repository::open(repo_root)?;
    let config = HostConfig::load(&repo.paths.config_yml)?;
    let live = config.live_environment()?;
    let ctx = ProfileContext::load(&repo, &live, name)?;
    let summary = summarize(&ctx)?;

    if json {
        let value = serde_json::json!({
            "profile": name,
            "chain": summary.chain.iter().collect::<Vec<_>>(),
            "depth": summary.chain.len(),
            "sync": summary.settings,
            "extensions": summary.extensions,
            "snippets": summary.snippets,
            "uiStateKeys": summary.ui_state_keys,
            "settings": summary.has_settings,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("Profile: {name}");
    println!("  chain: {}", summary.chain);
    let resources: Vec<&str> = summary.settings.resources.iter().map(|r| r.as_str()).collect();
    println!("  resources: {}", resources.join(", "));
    println!(
        "  extensions: {} enabled, {} disabled",
        summary.extensions.enabled.len(),
        summary.extensions.disabled.len()
    );
    for ext in &summary.extensions.enabled {
        println!("    + {ext}");
    }
    for ext in &summary.extensions.disabled {
        println!("    - {ext}");
    }
    if !summary.extensions.builtin_disabled().is_empty() {
        println!("  built-in disabled: {}", summary.extensions.builtin_disabled().join(", "));
    }
    println!("  snippets: {}", summary.snippets.len());
    println!("  ui state keys: {}", summary.ui_state_keys);
    println!(
        "  settings: {}",
        if summary.has_settings { "stored" } else { "(none)" }
    );
    Ok(())
}
