use crate::config::HostConfig;
use crate::host::EditorHost;
use loadout_engine::{
    plan_restore, restore_profile, ActionResult, ProfileContext, RestartDecision, RestoreOutcome,
    RestorePlan, RestoreReport,
};
use loadout_profile::Repository;
use std::path::Path;

/// `loadout restore <name> [--dry-run] [--yes]`
pub fn execute(repo_root: &Path, name: &str, dry_run: bool, yes: bool) -> anyhow::Result<()> {
    let repo = Repository::open(repo_root)?;
    let config = HostConfig::load(&repo.paths.config_yml)?;
    let live = config.live_environment()?;
    let mut host = EditorHost::from_config(&config, yes)?;

    if dry_run {
        let ctx = ProfileContext::load(&repo, &live, name)?;
        let plan = plan_restore(&ctx, &host)?;
        print_plan(&plan);
        return Ok(());
    }

    match restore_profile(&repo, &live, name, &mut host)? {
        RestoreOutcome::Applied(report) => {
            print_report(&report);
            let failed = report.failures().count();
            if failed > 0 {
                anyhow::bail!("{failed} extension action(s) failed");
            }
        }
        RestoreOutcome::Declined(plan) => {
            println!("Restore of {name} cancelled; nothing was changed.");
            print_plan(&plan);
        }
    }
    Ok(())
}

fn print_plan(plan: &RestorePlan) {
    println!("Plan for {}", plan.chain);
    let resources: Vec<&str> = plan.resources.iter().map(|r| r.as_str()).collect();
    println!("  resources: {}", resources.join(", "));
    match &plan.extensions {
        Some(ext) if !ext.reconcile.is_empty() => {
            for action in &ext.reconcile.actions {
                println!("  {action}");
            }
        }
        Some(_) => println!("  extensions: up to date"),
        None => {}
    }
    if let Some(ui) = &plan.ui_state {
        println!(
            "  ui state: {} to write, {} to delete",
            ui.upserts.len(),
            ui.deletes.len()
        );
    }
    if plan.restart != RestartDecision::NotNeeded {
        println!("  editor {} required", plan.restart);
    }
}

fn print_report(report: &RestoreReport) {
    println!("Restored profile {}", report.profile);
    for resource in &report.applied {
        println!("  applied {resource}");
    }
    for resource in &report.skipped {
        println!("  skipped {resource}");
    }
    for outcome in report.failures() {
        if let ActionResult::Failed(reason) = &outcome.result {
            println!("  failed  {}: {reason}", outcome.action);
        }
    }
    if report.snippets > 0 {
        println!("  snippets: {}", report.snippets);
    }
    if report.ui_state_writes > 0 {
        println!("  ui state: {} changes", report.ui_state_writes);
    }
}
