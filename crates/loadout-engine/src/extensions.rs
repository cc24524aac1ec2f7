//! Extension-set diff, chain composition, and reconciliation against the
//! live editor.

use crate::host::{encode_disabled_record, parse_disabled_record, Host, StateQuery, DISABLED_RECORD_KEY};
use anyhow::Result;
use loadout_core::{BuiltinExtensions, ExtensionId, ExtensionList, KeyMatcher};
use loadout_profile::{ProfileChain, Repository};
use std::collections::BTreeSet;
use std::fmt;
use tracing::{debug, info, warn};

// ── Diff ──

/// Delta that turns `base` into `live`.
///
/// Diff entries are set differences keyed by id; `builtin` is present only
/// when the built-in disabled list changed.
pub fn compute_diff(live: &ExtensionList, base: &ExtensionList) -> ExtensionList {
    let disabled = live
        .disabled
        .iter()
        .filter(|e| !base.is_disabled(e))
        .cloned()
        .collect();
    let enabled = live
        .enabled
        .iter()
        .filter(|e| !base.is_enabled(e))
        .cloned()
        .collect();
    let uninstall = base
        .installed()
        .filter(|e| !live.contains(e))
        .cloned()
        .collect();

    let builtin = if same_names(live.builtin_disabled(), base.builtin_disabled()) {
        None
    } else {
        Some(BuiltinExtensions {
            disabled: live.builtin_disabled().to_vec(),
        })
    };

    ExtensionList {
        disabled,
        enabled,
        uninstall,
        builtin,
    }
}

/// Apply a delta: disable, then enable, then uninstall.
pub fn apply_diff(base: &ExtensionList, diff: &ExtensionList) -> ExtensionList {
    let mut out = base.clone();
    out.uninstall.clear();
    for ext in &diff.disabled {
        out.mark_disabled(ext);
    }
    for ext in &diff.enabled {
        out.mark_enabled(ext);
    }
    for ext in &diff.uninstall {
        out.remove(ext);
    }
    if let Some(builtin) = &diff.builtin {
        out.builtin = (!builtin.disabled.is_empty()).then(|| builtin.clone());
    }
    out
}

fn same_names(a: &[String], b: &[String]) -> bool {
    let lower = |v: &[String]| -> BTreeSet<String> { v.iter().map(|s| s.to_ascii_lowercase()).collect() };
    lower(a) == lower(b)
}

/// Fold the chain's extension documents, oldest ancestor first.
pub fn effective_extensions(repo: &Repository, chain: &ProfileChain) -> Result<ExtensionList> {
    let mut acc = ExtensionList::default();
    for name in chain.oldest_first() {
        if let Some(doc) = repo.read_extensions(name)? {
            acc = apply_diff(&acc, &doc);
        }
    }
    Ok(acc)
}

/// Document to store for the leaf of `chain`: the full live list for a
/// root profile, otherwise the delta against the parent's effective list.
pub fn stored_extensions(repo: &Repository, chain: &ProfileChain, live: &ExtensionList) -> Result<ExtensionList> {
    let base = match chain.parent_chain() {
        Some(parent) => effective_extensions(repo, &parent)?,
        None => ExtensionList::default(),
    };
    Ok(compute_diff(live, &base))
}

// ── Reconciliation ──

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtensionAction {
    Install(ExtensionId),
    Uninstall(ExtensionId),
    Enable(ExtensionId),
    Disable(ExtensionId),
    /// Rewrite the disabled record (hosts without native toggling).
    WriteDisabledRecord(Vec<ExtensionId>),
}

impl fmt::Display for ExtensionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtensionAction::Install(e) => write!(f, "install {e}"),
            ExtensionAction::Uninstall(e) => write!(f, "uninstall {e}"),
            ExtensionAction::Enable(e) => write!(f, "enable {e}"),
            ExtensionAction::Disable(e) => write!(f, "disable {e}"),
            ExtensionAction::WriteDisabledRecord(ids) => {
                write!(f, "write disabled record ({} entries)", ids.len())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionResult {
    Succeeded,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionOutcome {
    pub action: ExtensionAction,
    pub result: ActionResult,
}

impl ActionOutcome {
    pub fn failed(&self) -> bool {
        matches!(self.result, ActionResult::Failed(_))
    }
}

/// Commands that bring the live editor to a target extension state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcilePlan {
    pub actions: Vec<ExtensionAction>,
    /// Some target-disabled extension only takes effect after a restart.
    pub restart_required: bool,
}

impl ReconcilePlan {
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

/// Plan the commands turning `live` into `target`.
///
/// Ids matching `ignored` are never touched. Uninstalls come first, then
/// installs, then enablement changes.
pub fn plan_reconcile(
    target: &ExtensionList,
    live: &ExtensionList,
    native: bool,
    ignored: &KeyMatcher,
) -> ReconcilePlan {
    let mut uninstalls = Vec::new();
    let mut installs = Vec::new();
    let mut toggles = Vec::new();
    let mut restart_required = false;

    for ext in live.installed() {
        if !ignored.is_match(&ext.id) && !target.contains(ext) {
            uninstalls.push(ExtensionAction::Uninstall(ext.clone()));
        }
    }

    for ext in target.installed() {
        if ignored.is_match(&ext.id) {
            continue;
        }
        let want_enabled = target.is_enabled(ext);
        if !live.contains(ext) {
            installs.push(ExtensionAction::Install(ext.clone()));
            if !want_enabled {
                if native {
                    toggles.push(ExtensionAction::Disable(ext.clone()));
                } else {
                    restart_required = true;
                }
            }
            continue;
        }
        if live.is_enabled(ext) == want_enabled {
            continue;
        }
        match (native, want_enabled) {
            (true, true) => toggles.push(ExtensionAction::Enable(ext.clone())),
            (true, false) => toggles.push(ExtensionAction::Disable(ext.clone())),
            (false, true) => {
                uninstalls.push(ExtensionAction::Uninstall(ext.clone()));
                installs.push(ExtensionAction::Install(ext.clone()));
            }
            (false, false) => restart_required = true,
        }
    }

    let target_builtin = visible(target.builtin_disabled(), ignored);
    let live_builtin = visible(live.builtin_disabled(), ignored);
    let newly_disabled: Vec<&String> = target_builtin
        .iter()
        .filter(|b| !contains_name(&live_builtin, b))
        .collect();
    if native {
        for b in &newly_disabled {
            toggles.push(ExtensionAction::Disable(ExtensionId::new(b.as_str())));
        }
        for b in live_builtin.iter().filter(|b| !contains_name(&target_builtin, b)) {
            toggles.push(ExtensionAction::Enable(ExtensionId::new(b.as_str())));
        }
    } else if !newly_disabled.is_empty() {
        restart_required = true;
    }

    let mut actions = uninstalls;
    actions.extend(installs);
    actions.extend(toggles);

    if !native {
        let record = disabled_record(target, &target_builtin, ignored);
        let current = disabled_record(live, &live_builtin, ignored);
        let keys = |ids: &[ExtensionId]| -> BTreeSet<String> { ids.iter().map(ExtensionId::key).collect() };
        if keys(&record) != keys(&current) {
            actions.push(ExtensionAction::WriteDisabledRecord(record));
        }
    }

    ReconcilePlan {
        actions,
        restart_required,
    }
}

fn visible(names: &[String], ignored: &KeyMatcher) -> Vec<String> {
    names.iter().filter(|n| !ignored.is_match(n)).cloned().collect()
}

fn contains_name(names: &[String], name: &str) -> bool {
    names.iter().any(|n| n.eq_ignore_ascii_case(name))
}

fn disabled_record(list: &ExtensionList, builtin: &[String], ignored: &KeyMatcher) -> Vec<ExtensionId> {
    list.disabled
        .iter()
        .filter(|e| !ignored.is_match(&e.id))
        .cloned()
        .chain(builtin.iter().map(|b| ExtensionId::new(b.as_str())))
        .collect()
}

/// Run every planned action. A failing action is logged and recorded;
/// the rest still run.
pub fn execute_plan(plan: &ReconcilePlan, host: &mut dyn Host, ignored: &KeyMatcher) -> Vec<ActionOutcome> {
    let mut outcomes = Vec::with_capacity(plan.actions.len());
    for action in &plan.actions {
        let result = match action {
            ExtensionAction::Install(e) => host.install(e),
            ExtensionAction::Uninstall(e) => host.uninstall(e),
            ExtensionAction::Enable(e) => host.enable(e),
            ExtensionAction::Disable(e) => host.disable(e),
            ExtensionAction::WriteDisabledRecord(ids) => write_disabled_record(host, ids, ignored),
        };
        let result = match result {
            Ok(()) => {
                info!(%action, "extension action applied");
                ActionResult::Succeeded
            }
            Err(e) => {
                let reason = format!("{e:#}");
                warn!(%action, error = %reason, "extension action failed");
                ActionResult::Failed(reason)
            }
        };
        outcomes.push(ActionOutcome {
            action: action.clone(),
            result,
        });
    }
    outcomes
}

/// Replace the record, keeping entries for ignored extensions as they are.
fn write_disabled_record(host: &mut dyn Host, ids: &[ExtensionId], ignored: &KeyMatcher) -> Result<()> {
    let query = StateQuery {
        prefixes: Vec::new(),
        keys: vec![DISABLED_RECORD_KEY.to_string()],
    };
    let current = host.read_state(&query)?;
    let mut record: Vec<ExtensionId> = current
        .get(DISABLED_RECORD_KEY)
        .map(|raw| parse_disabled_record(raw))
        .unwrap_or_default()
        .into_iter()
        .filter(|e| ignored.is_match(&e.id))
        .collect();
    record.extend(ids.iter().cloned());
    debug!(entries = record.len(), "writing disabled record");

    if record.is_empty() {
        host.write_state(&[], &[DISABLED_RECORD_KEY.to_string()])
    } else {
        let raw = encode_disabled_record(&record)?;
        host.write_state(&[(DISABLED_RECORD_KEY.to_string(), raw)], &[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{ExtensionHost, MemoryHost};

    fn ids(names: &[&str]) -> Vec<ExtensionId> {
        names.iter().map(|n| ExtensionId::new(*n)).collect()
    }

    fn list(disabled: &[&str], enabled: &[&str]) -> ExtensionList {
        ExtensionList {
            disabled: ids(disabled),
            enabled: ids(enabled),
            ..Default::default()
        }
    }

    fn none() -> KeyMatcher {
        KeyMatcher::new(&[]).unwrap()
    }

    #[test]
    fn diff_is_set_difference() {
        let base = list(&["a.x"], &["b.y", "c.z"]);
        let live = list(&["b.y"], &["c.z", "d.w"]);
        let diff = compute_diff(&live, &base);
        assert_eq!(diff.disabled, ids(&["b.y"]));
        assert_eq!(diff.enabled, ids(&["d.w"]));
        assert_eq!(diff.uninstall, ids(&["a.x"]));
        assert!(diff.builtin.is_none());

        let applied = apply_diff(&base, &diff);
        assert_eq!(applied.sorted(), live.sorted());
    }

    #[test]
    fn diff_against_empty_base_is_the_full_list() {
        let live = list(&["a.x"], &["b.y"]);
        assert_eq!(compute_diff(&live, &ExtensionList::default()), live);
    }

    #[test]
    fn diff_matches_ids_case_insensitively() {
        let base = list(&[], &["Publisher.Ext"]);
        let live = list(&[], &["publisher.ext"]);
        assert!(compute_diff(&live, &base).is_empty());
    }

    #[test]
    fn builtin_only_emitted_on_change() {
        let mut base = list(&[], &[]);
        base.builtin = Some(BuiltinExtensions {
            disabled: vec!["vscode.git".into()],
        });
        let mut live = base.clone();
        assert!(compute_diff(&live, &base).builtin.is_none());

        live.builtin = None;
        let diff = compute_diff(&live, &base);
        assert_eq!(diff.builtin, Some(BuiltinExtensions::default()));
        assert!(apply_diff(&base, &diff).builtin.is_none());
    }

    #[test]
    fn reconcile_native_host() {
        let target = list(&["b.y"], &["a.x", "c.z"]);
        let live = list(&["a.x"], &["b.y", "old.one"]);
        let plan = plan_reconcile(&target, &live, true, &none());
        assert_eq!(
            plan.actions,
            vec![
                ExtensionAction::Uninstall(ExtensionId::new("old.one")),
                ExtensionAction::Install(ExtensionId::new("c.z")),
                ExtensionAction::Disable(ExtensionId::new("b.y")),
                ExtensionAction::Enable(ExtensionId::new("a.x")),
            ]
        );
        assert!(!plan.restart_required);
    }

    #[test]
    fn reconcile_without_native_toggle_uses_record() {
        let target = list(&["b.y"], &["a.x"]);
        let live = list(&["a.x"], &["b.y"]);
        let plan = plan_reconcile(&target, &live, false, &none());
        assert_eq!(
            plan.actions,
            vec![
                ExtensionAction::Uninstall(ExtensionId::new("a.x")),
                ExtensionAction::Install(ExtensionId::new("a.x")),
                ExtensionAction::WriteDisabledRecord(ids(&["b.y"])),
            ]
        );
        assert!(plan.restart_required);
    }

    #[test]
    fn reconcile_skips_ignored_extensions() {
        let ignored = KeyMatcher::case_insensitive(&["ms-python.*".into()]).unwrap();
        let target = list(&[], &["ms-python.python", "a.x"]);
        let live = list(&[], &["a.x"]);
        assert!(plan_reconcile(&target, &live, true, &ignored).is_empty());
    }

    #[test]
    fn reconcile_in_sync_is_empty() {
        let target = list(&["b.y"], &["a.x"]);
        assert!(plan_reconcile(&target, &target.clone(), false, &none()).is_empty());
        assert!(plan_reconcile(&target, &target.clone(), true, &none()).is_empty());
    }

    #[test]
    fn execution_continues_past_failures() {
        let mut host = MemoryHost::new().with_native_toggle();
        host.failing.insert("bad.one".into());
        let plan = ReconcilePlan {
            actions: vec![
                ExtensionAction::Install(ExtensionId::new("bad.one")),
                ExtensionAction::Install(ExtensionId::new("good.one")),
            ],
            restart_required: false,
        };
        let outcomes = execute_plan(&plan, &mut host, &none());
        assert!(outcomes[0].failed());
        assert_eq!(outcomes[1].result, ActionResult::Succeeded);
        assert!(host.installed.contains_key("good.one"));
    }

    #[test]
    fn record_rewrite_keeps_ignored_entries() {
        let mut host = MemoryHost::new();
        host.add_extension("secret.ext", true);
        host.add_extension("a.x", true);
        host.set_state(DISABLED_RECORD_KEY, r#"[{"id":"secret.ext"}]"#);
        let ignored = KeyMatcher::case_insensitive(&["secret.*".into()]).unwrap();

        let plan = ReconcilePlan {
            actions: vec![ExtensionAction::WriteDisabledRecord(ids(&["a.x"]))],
            restart_required: true,
        };
        execute_plan(&plan, &mut host, &ignored);
        let listed = host.list_extensions(&none()).unwrap();
        assert!(listed.is_disabled(&ExtensionId::new("secret.ext")));
        assert!(listed.is_disabled(&ExtensionId::new("a.x")));
    }
}
