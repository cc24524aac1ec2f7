//! Apply a profile to the live editor.
//!
//! Everything the restore will change is computed first, read-only, so the
//! restart decision can gate a confirmation before anything is mutated.

use crate::extensions::{effective_extensions, execute_plan, plan_reconcile, ActionOutcome, ReconcilePlan};
use crate::host::{Host, RestartDecision};
use crate::settings::{restore_keybindings, restore_settings};
use crate::snippets::restore_snippets;
use crate::ui_state::{self, Redactor, UiStatePlan};
use crate::{LiveEnvironment, ProfileContext};
use anyhow::Result;
use loadout_core::{ExtensionList, Resource};
use loadout_profile::{ProfileChain, Repository};
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct ExtensionsPlan {
    pub target: ExtensionList,
    pub live: ExtensionList,
    pub reconcile: ReconcilePlan,
}

/// What a restore would do, computed without side effects.
#[derive(Debug, Clone)]
pub struct RestorePlan {
    pub chain: ProfileChain,
    pub resources: Vec<Resource>,
    pub extensions: Option<ExtensionsPlan>,
    pub ui_state: Option<UiStatePlan>,
    pub restart: RestartDecision,
}

/// Restart when a disable can only take effect on startup or UI state will
/// change; reload when only natively applied extension changes remain.
pub fn restart_decision(extensions: Option<&ReconcilePlan>, ui_state: Option<&UiStatePlan>) -> RestartDecision {
    let ui_changes = ui_state.is_some_and(|p| !p.is_empty());
    match extensions {
        Some(p) if p.restart_required => RestartDecision::Restart,
        _ if ui_changes => RestartDecision::Restart,
        Some(p) if !p.is_empty() => RestartDecision::Reload,
        _ => RestartDecision::NotNeeded,
    }
}

pub fn plan_restore(ctx: &ProfileContext<'_>, host: &dyn Host) -> Result<RestorePlan> {
    let syncs_extensions = ctx.settings.syncs(Resource::Extensions);
    let syncs_ui_state = ctx.settings.syncs(Resource::UiState);

    let ignored = ctx.ignored_extensions()?;
    let live_extensions = if syncs_extensions || syncs_ui_state {
        host.list_extensions(&ignored)?
    } else {
        ExtensionList::default()
    };

    let extensions = if syncs_extensions {
        let target = effective_extensions(ctx.repo, &ctx.chain)?;
        let reconcile = plan_reconcile(
            &target,
            &live_extensions,
            host.supports_native_toggle(),
            &ignored,
        );
        Some(ExtensionsPlan {
            target,
            live: live_extensions.clone(),
            reconcile,
        })
    } else {
        None
    };

    let ui_state = if syncs_ui_state {
        let effective = ui_state::effective_ui_state(ctx.repo, &ctx.chain)?;
        let live_state = ui_state::read_live_state(host, &live_extensions)?;
        Some(ui_state::plan_restore(
            &effective,
            &live_state,
            &Redactor::new(ctx.live),
        ))
    } else {
        None
    };

    let restart = restart_decision(
        extensions.as_ref().map(|p| &p.reconcile),
        ui_state.as_ref(),
    );
    Ok(RestorePlan {
        chain: ctx.chain.clone(),
        resources: ctx.settings.resources.clone(),
        extensions,
        ui_state,
        restart,
    })
}

#[derive(Debug, Clone)]
pub struct RestoreReport {
    pub profile: String,
    pub applied: Vec<Resource>,
    pub skipped: Vec<Resource>,
    pub extension_outcomes: Vec<ActionOutcome>,
    pub snippets: usize,
    pub ui_state_writes: usize,
    pub restart: RestartDecision,
}

impl RestoreReport {
    pub fn failures(&self) -> impl Iterator<Item = &ActionOutcome> {
        self.extension_outcomes.iter().filter(|o| o.failed())
    }
}

#[derive(Debug, Clone)]
pub enum RestoreOutcome {
    Applied(RestoreReport),
    /// The user declined the restart; nothing was changed.
    Declined(RestorePlan),
}

/// Resolve, plan, confirm, then apply `name` to the live editor.
pub fn restore_profile(
    repo: &Repository,
    live: &LiveEnvironment,
    name: &str,
    host: &mut dyn Host,
) -> Result<RestoreOutcome> {
    let ctx = ProfileContext::load(repo, live, name)?;
    let plan = plan_restore(&ctx, host)?;
    if plan.restart != RestartDecision::NotNeeded && !host.confirm_restart(plan.restart)? {
        info!(profile = name, restart = %plan.restart, "restore declined");
        return Ok(RestoreOutcome::Declined(plan));
    }
    let report = apply_restore(&ctx, &plan, host)?;
    Ok(RestoreOutcome::Applied(report))
}

/// Apply a computed plan, resource by resource in fixed order.
pub fn apply_restore(ctx: &ProfileContext<'_>, plan: &RestorePlan, host: &mut dyn Host) -> Result<RestoreReport> {
    let mut report = RestoreReport {
        profile: ctx.leaf().to_string(),
        applied: Vec::new(),
        skipped: Vec::new(),
        extension_outcomes: Vec::new(),
        snippets: 0,
        ui_state_writes: 0,
        restart: plan.restart,
    };
    let ignored = ctx.ignored_extensions()?;

    for resource in Resource::ALL {
        if !ctx.settings.syncs(resource) {
            report.skipped.push(resource);
            continue;
        }
        let applied = match resource {
            Resource::Extensions => match &plan.extensions {
                Some(p) => {
                    report.extension_outcomes = execute_plan(&p.reconcile, host, &ignored);
                    true
                }
                None => false,
            },
            Resource::Keybindings => restore_keybindings(ctx)?,
            Resource::Settings => restore_settings(ctx)?,
            Resource::Snippets => {
                report.snippets = restore_snippets(ctx.repo, &ctx.chain, &ctx.live.snippets_dir())?;
                true
            }
            Resource::UiState => match &plan.ui_state {
                Some(p) => {
                    if !p.is_empty() {
                        host.write_state(&p.upserts, &p.deletes)?;
                    }
                    report.ui_state_writes = p.upserts.len() + p.deletes.len();
                    true
                }
                None => false,
            },
        };
        if applied {
            report.applied.push(resource);
        } else {
            report.skipped.push(resource);
        }
    }

    let failed = report.failures().count();
    if failed > 0 {
        warn!(profile = ctx.leaf(), failed, "some extension actions failed");
    }

    match plan.restart {
        RestartDecision::Restart => host.trigger_restart()?,
        RestartDecision::Reload => host.trigger_reload()?,
        RestartDecision::NotNeeded => {}
    }
    info!(
        profile = ctx.leaf(),
        chain = %ctx.chain,
        restart = %plan.restart,
        "profile restored"
    );
    Ok(report)
}
