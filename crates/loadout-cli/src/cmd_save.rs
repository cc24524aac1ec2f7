use crate::config::HostConfig;
use crate::host::EditorHost;
use loadout_engine::{serialize_profile, SerializeReport, SkipReason};
use loadout_profile::Repository;
use std::path::Path;

/// `loadout save <name>`
pub fn execute(repo_root: &Path, name: &str) -> anyhow::Result<()> {
    let repo = Repository::open(repo_root)?;
    let config = HostConfig::load(&repo.paths.config_yml)?;
    let live = config.live_environment()?;
    let host = EditorHost::from_config(&config, false)?;

    let report = serialize_profile(&repo, &live, name, &host)?;
    print_report(&report);
    Ok(())
}

fn skip_label(reason: SkipReason) -> &'static str {
    match reason {
        SkipReason::NotSynced => "not synced",
        SkipReason::Inherited => "stored by the root profile",
        SkipReason::Missing => "nothing to save",
    }
}

fn print_report(report: &SerializeReport) {
    println!("Saved profile {}", report.profile);
    for resource in &report.saved {
        println!("  saved   {resource}");
    }
    for (resource, reason) in &report.skipped {
        println!("  skipped {resource} ({})", skip_label(*reason));
    }
    if let Some(ext) = &report.extensions {
        println!(
            "  extensions: {} enabled, {} disabled, {} uninstall",
            ext.enabled.len(),
            ext.disabled.len(),
            ext.uninstall.len()
        );
    }
    if let Some(snippets) = &report.snippets {
        println!(
            "  snippets: {} copied, {} removed",
            snippets.copied.len(),
            snippets.removed.len()
        );
    }
    if report.ui_state_keys > 0 {
        println!("  ui state: {} keys", report.ui_state_keys);
    }
}
