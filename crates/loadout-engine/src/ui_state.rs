//! UI state: a key/value projection of the editor's state store.
//!
//! Captured rows are redacted before storage. Occurrences of the live
//! extension directory become a placeholder, and rows that still mention
//! the home directory are machine-local and never stored.

use crate::host::{Host, StateQuery};
use crate::LiveEnvironment;
use anyhow::Result;
use loadout_core::{ExtensionList, UiStateDiff, UiStateMap, EXTENSIONS_PATH_TOKEN};
use loadout_profile::{ProfileChain, Repository};
use serde_json::Value;
use tracing::debug;

/// State-store key prefixes that belong to the UI projection.
pub const STATE_PREFIXES: &[&str] = &["workbench.", "memento/", "views.", "window.", "terminal."];

/// Rows in scope: the fixed prefixes plus one key per extension id.
pub fn state_query(extensions: &ExtensionList) -> StateQuery {
    StateQuery {
        prefixes: STATE_PREFIXES.iter().map(|p| p.to_string()).collect(),
        keys: extensions.installed().map(|e| e.id.clone()).collect(),
    }
}

/// Raw store strings holding a JSON object or array are kept structured
/// when they re-encode to the same bytes; anything else stays a string.
pub fn decode_value(raw: &str) -> Value {
    if raw.starts_with('{') || raw.starts_with('[') {
        if let Ok(v) = serde_json::from_str::<Value>(raw) {
            if encode_value(&v) == raw {
                return v;
            }
        }
    }
    Value::String(raw.to_string())
}

pub fn encode_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[derive(Debug, Clone)]
pub struct Redactor {
    extensions_path: String,
    home: Option<String>,
}

impl Redactor {
    pub fn new(live: &LiveEnvironment) -> Self {
        Self {
            extensions_path: live.extensions_dir.to_string_lossy().into_owned(),
            home: live
                .home_dir
                .as_ref()
                .map(|h| h.to_string_lossy().into_owned())
                .filter(|h| !h.is_empty()),
        }
    }

    /// `None` when the value is machine-local.
    pub fn redact(&self, value: &Value) -> Option<Value> {
        let out = map_strings(value, &|s| {
            if self.extensions_path.is_empty() {
                s.to_string()
            } else {
                s.replace(&self.extensions_path, EXTENSIONS_PATH_TOKEN)
            }
        });
        if self.mentions_home(&out) {
            None
        } else {
            Some(out)
        }
    }

    pub fn unredact(&self, value: &Value) -> Value {
        map_strings(value, &|s| s.replace(EXTENSIONS_PATH_TOKEN, &self.extensions_path))
    }

    fn mentions_home(&self, value: &Value) -> bool {
        let Some(home) = &self.home else {
            return false;
        };
        match value {
            Value::String(s) => s.contains(home.as_str()),
            Value::Array(items) => items.iter().any(|v| self.mentions_home(v)),
            Value::Object(map) => map
                .iter()
                .any(|(k, v)| k.contains(home.as_str()) || self.mentions_home(v)),
            _ => false,
        }
    }
}

fn map_strings(value: &Value, f: &dyn Fn(&str) -> String) -> Value {
    match value {
        Value::String(s) => Value::String(f(s)),
        Value::Array(items) => Value::Array(items.iter().map(|v| map_strings(v, f)).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (f(k), map_strings(v, f)))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Read the in-scope rows of the live store, decoded but not redacted.
pub fn read_live_state(host: &dyn Host, extensions: &ExtensionList) -> Result<UiStateMap> {
    let rows = host.read_state(&state_query(extensions))?;
    Ok(rows.iter().map(|(k, raw)| (k.clone(), decode_value(raw))).collect())
}

/// Redacted snapshot for storage.
pub fn capture(live_state: &UiStateMap, redactor: &Redactor) -> UiStateMap {
    live_state
        .iter()
        .filter_map(|(k, v)| redactor.redact(v).map(|v| (k.clone(), v)))
        .collect()
}

// ── Diff ──

pub fn compute_diff(state: &UiStateMap, ancestor: &UiStateMap) -> UiStateDiff {
    let modified = state
        .iter()
        .filter(|(k, v)| ancestor.get(*k) != Some(*v))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    let removed = ancestor
        .keys()
        .filter(|k| !state.contains_key(*k))
        .cloned()
        .collect();
    UiStateDiff { modified, removed }
}

pub fn apply_diff(base: &UiStateMap, diff: &UiStateDiff) -> UiStateMap {
    let mut out = base.clone();
    for (k, v) in &diff.modified {
        out.insert(k.clone(), v.clone());
    }
    for k in &diff.removed {
        out.remove(k);
    }
    out
}

/// Root baseline, then every descendant's diff, oldest first.
pub fn effective_ui_state(repo: &Repository, chain: &ProfileChain) -> Result<UiStateMap> {
    let mut state = repo.read_ui_state(chain.root())?.unwrap_or_default();
    for name in chain.oldest_first().skip(1) {
        state = apply_diff(&state, &repo.read_ui_state_diff(name)?);
    }
    Ok(state)
}

/// Store a captured snapshot: full baseline for a root profile, diff
/// against the parent's effective state otherwise. Returns the number of
/// keys written.
pub fn serialize_ui_state(repo: &Repository, chain: &ProfileChain, captured: &UiStateMap) -> Result<usize> {
    match chain.parent_chain() {
        None => {
            repo.write_ui_state(chain.leaf(), captured)?;
            Ok(captured.len())
        }
        Some(parent) => {
            let ancestor = effective_ui_state(repo, &parent)?;
            let diff = compute_diff(captured, &ancestor);
            repo.store_ui_state_diff(chain.leaf(), &diff)?;
            debug!(
                profile = chain.leaf(),
                modified = diff.modified.len(),
                removed = diff.removed.len(),
                "ui state diff stored"
            );
            Ok(diff.modified.len() + diff.removed.len())
        }
    }
}

// ── Restore ──

/// Store writes needed to make the live state match a profile.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UiStatePlan {
    pub upserts: Vec<(String, String)>,
    pub deletes: Vec<String>,
}

impl UiStatePlan {
    pub fn is_empty(&self) -> bool {
        self.upserts.is_empty() && self.deletes.is_empty()
    }
}

/// Compare the effective state with the live rows.
///
/// Live rows absent from the profile are deleted, except machine-local rows
/// which were never captured in the first place.
pub fn plan_restore(effective: &UiStateMap, live_state: &UiStateMap, redactor: &Redactor) -> UiStatePlan {
    let mut plan = UiStatePlan::default();
    for (key, stored) in effective {
        let wanted = redactor.unredact(stored);
        if live_state.get(key) != Some(&wanted) {
            plan.upserts.push((key.clone(), encode_value(&wanted)));
        }
    }
    plan.deletes = live_state
        .iter()
        .filter(|(key, value)| !effective.contains_key(*key) && redactor.redact(value).is_some())
        .map(|(key, _)| key.clone())
        .collect();
    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use loadout_core::Platform;
    use serde_json::json;

    fn redactor() -> Redactor {
        let mut live = LiveEnvironment::new("/home/u/.config/Code/User", "/home/u/.vscode/extensions");
        live.home_dir = Some("/home/u".into());
        live.platform = Platform::Linux;
        Redactor::new(&live)
    }

    fn map(entries: &[(&str, Value)]) -> UiStateMap {
        entries.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn values_decode_structured_only_for_objects_and_arrays() {
        assert_eq!(decode_value("{\"a\":1}"), json!({"a": 1}));
        assert_eq!(decode_value("[1,2]"), json!([1, 2]));
        assert_eq!(decode_value("42"), json!("42"));
        assert_eq!(decode_value("true"), json!("true"));
        assert_eq!(decode_value("{broken"), json!("{broken"));
        assert_eq!(decode_value("{\"a\": 1}"), json!("{\"a\": 1}"));
        assert_eq!(encode_value(&json!("42")), "42");
        assert_eq!(encode_value(&json!([1, 2])), "[1,2]");
    }

    #[test]
    fn redaction_round_trips_extension_paths() {
        let r = redactor();
        let live = json!({"icon": "/home/u/.vscode/extensions/foo-1.0/icon.png"});
        let stored = r.redact(&live).unwrap();
        assert_eq!(stored, json!({"icon": "${extensionsPath}/foo-1.0/icon.png"}));
        assert_eq!(r.unredact(&stored), live);
    }

    #[test]
    fn structured_rows_reencode_byte_for_byte() {
        let raw = r#"{"z":1,"a":[true,null],"m":{"y":"x","b":2}}"#;
        let value = decode_value(raw);
        assert!(value.is_object());
        assert_eq!(encode_value(&value), raw);
    }

    #[test]
    fn object_keys_are_redacted_too() {
        let r = redactor();
        assert!(r.redact(&json!({"/home/u/projects/secret": {"open": true}})).is_none());

        let live = json!({"/home/u/.vscode/extensions/foo-1.0": {"pinned": true}});
        let stored = r.redact(&live).unwrap();
        assert_eq!(stored, json!({"${extensionsPath}/foo-1.0": {"pinned": true}}));
        assert_eq!(r.unredact(&stored), live);
    }

    #[test]
    fn home_paths_are_machine_local() {
        let r = redactor();
        assert!(r.redact(&json!("/home/u/projects/x")).is_none());
        assert!(r.redact(&json!(["a", {"cwd": "/home/u"}])).is_none());
        assert!(r.redact(&json!("/opt/tool")).is_some());
    }

    #[test]
    fn diff_and_apply() {
        let base = map(&[("a", json!("1")), ("b", json!("2"))]);
        let state = map(&[("a", json!("1")), ("c", json!("3"))]);
        let diff = compute_diff(&state, &base);
        assert_eq!(diff.modified, map(&[("c", json!("3"))]));
        assert_eq!(diff.removed, vec!["b"]);
        assert_eq!(apply_diff(&base, &diff), state);
        assert!(compute_diff(&state, &state).is_empty());
    }

    #[test]
    fn restore_plan_upserts_changes_and_deletes_extras() {
        let r = redactor();
        let effective = map(&[
            ("workbench.a", json!("1")),
            ("workbench.icons", json!(["${extensionsPath}/x"])),
        ]);
        let live = map(&[
            ("workbench.a", json!("1")),
            ("workbench.stale", json!("x")),
            ("terminal.cwd", json!("/home/u/src")),
        ]);
        let plan = plan_restore(&effective, &live, &r);
        assert_eq!(
            plan.upserts,
            vec![(
                "workbench.icons".to_string(),
                "[\"/home/u/.vscode/extensions/x\"]".to_string()
            )]
        );
        assert_eq!(plan.deletes, vec!["workbench.stale"]);
    }

    #[test]
    fn restore_plan_is_empty_when_in_sync() {
        let r = redactor();
        let live = map(&[("workbench.a", json!({"k": "/home/u/.vscode/extensions/y"}))]);
        let effective = capture(&live, &r);
        assert!(plan_restore(&effective, &live, &r).is_empty());
    }
}
