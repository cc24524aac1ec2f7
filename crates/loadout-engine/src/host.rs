//! Collaborator interfaces to the running editor, plus an in-memory host.

use anyhow::{bail, Result};
use loadout_core::{BuiltinExtensions, ExtensionId, ExtensionList, KeyMatcher};
use std::collections::{BTreeMap, BTreeSet};

/// Key of the editor's record of extensions disabled without native support.
pub const DISABLED_RECORD_KEY: &str = "extensionsIdentifiers/disabled";

/// Whether applying a profile needs the editor restarted or reloaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RestartDecision {
    NotNeeded,
    Reload,
    Restart,
}

impl RestartDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            RestartDecision::NotNeeded => "not-needed",
            RestartDecision::Reload => "reload",
            RestartDecision::Restart => "restart",
        }
    }
}

impl std::fmt::Display for RestartDecision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Installed-extension inventory and the commands that change it.
pub trait ExtensionHost {
    /// Live extensions, partitioned by enablement. Ids matching `ignored`
    /// are left out entirely.
    fn list_extensions(&self, ignored: &KeyMatcher) -> Result<ExtensionList>;
    fn install(&mut self, ext: &ExtensionId) -> Result<()>;
    fn uninstall(&mut self, ext: &ExtensionId) -> Result<()>;
    fn enable(&mut self, ext: &ExtensionId) -> Result<()>;
    fn disable(&mut self, ext: &ExtensionId) -> Result<()>;
    /// `false` when enable/disable must go through the disabled record.
    fn supports_native_toggle(&self) -> bool;
}

/// Rows to read from the editor's key/value state store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateQuery {
    pub prefixes: Vec<String>,
    pub keys: Vec<String>,
}

impl StateQuery {
    pub fn matches(&self, key: &str) -> bool {
        self.prefixes.iter().any(|p| key.starts_with(p.as_str())) || self.keys.iter().any(|k| k == key)
    }
}

/// The editor's key/value state store. Values are raw strings.
pub trait StateStore {
    fn read_state(&self, query: &StateQuery) -> Result<BTreeMap<String, String>>;
    fn write_state(&mut self, upserts: &[(String, String)], deletes: &[String]) -> Result<()>;
}

/// Restart confirmation and triggering for the editor session.
pub trait SessionControl {
    fn confirm_restart(&mut self, decision: RestartDecision) -> Result<bool>;
    fn trigger_restart(&mut self) -> Result<()>;
    fn trigger_reload(&mut self) -> Result<()>;
}

/// Everything the engine needs from a running editor.
pub trait Host: ExtensionHost + StateStore + SessionControl {}

impl<T: ExtensionHost + StateStore + SessionControl> Host for T {}

/// Decode the disabled record. Malformed records read as empty.
pub fn parse_disabled_record(raw: &str) -> Vec<ExtensionId> {
    serde_json::from_str(raw).unwrap_or_default()
}

pub fn encode_disabled_record(ids: &[ExtensionId]) -> Result<String> {
    Ok(serde_json::to_string(ids)?)
}

/// Partition installed extensions `(id, natively enabled)` using the
/// disabled record. Record entries that are not installed are built-ins.
pub fn partition_by_record(
    installed: &[(ExtensionId, bool)],
    record: &[ExtensionId],
    ignored: &KeyMatcher,
) -> ExtensionList {
    let recorded = |ext: &ExtensionId| record.iter().any(|r| r.same_as(ext));
    let mut list = ExtensionList::default();
    for (ext, enabled) in installed {
        if ignored.is_match(&ext.id) {
            continue;
        }
        if *enabled && !recorded(ext) {
            list.enabled.push(ext.clone());
        } else {
            list.disabled.push(ext.clone());
        }
    }

    let mut builtin: Vec<String> = Vec::new();
    for ext in record {
        let is_installed = installed.iter().any(|(e, _)| e.same_as(ext));
        if !is_installed && !builtin.iter().any(|b| b.eq_ignore_ascii_case(&ext.id)) {
            builtin.push(ext.id.clone());
        }
    }
    if !builtin.is_empty() {
        list.builtin = Some(BuiltinExtensions { disabled: builtin });
    }
    list
}

// ── In-memory host ──

/// In-memory editor (for testing).
///
/// Without native toggling, enablement is read from the disabled record in
/// `state`, the way a real editor does on startup.
#[derive(Debug, Clone, Default)]
pub struct MemoryHost {
    /// Installed extensions by lowercase id, with their enabled flag.
    pub installed: BTreeMap<String, (ExtensionId, bool)>,
    pub builtin_disabled: Vec<String>,
    pub native_toggle: bool,
    pub state: BTreeMap<String, String>,
    /// Answer given to every restart confirmation.
    pub confirm: bool,
    /// Ids whose operations fail.
    pub failing: BTreeSet<String>,
    /// Extension commands issued, e.g. `install a.x`.
    pub calls: Vec<String>,
    pub confirmations: Vec<RestartDecision>,
    pub restarts: usize,
    pub reloads: usize,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self {
            confirm: true,
            ..Self::default()
        }
    }

    pub fn with_native_toggle(mut self) -> Self {
        self.native_toggle = true;
        self
    }

    pub fn add_extension(&mut self, id: &str, enabled: bool) {
        let ext = ExtensionId::new(id);
        self.installed.insert(ext.key(), (ext, enabled));
    }

    pub fn set_state(&mut self, key: &str, value: &str) {
        self.state.insert(key.to_string(), value.to_string());
    }

    fn record(&self) -> Vec<ExtensionId> {
        self.state
            .get(DISABLED_RECORD_KEY)
            .map(|raw| parse_disabled_record(raw))
            .unwrap_or_default()
    }

    fn command(&mut self, verb: &str, ext: &ExtensionId) -> Result<()> {
        self.calls.push(format!("{verb} {}", ext.key()));
        if self.failing.contains(&ext.key()) {
            bail!("{verb} failed for {ext}");
        }
        Ok(())
    }

    fn toggle(&mut self, verb: &str, ext: &ExtensionId, enabled: bool) -> Result<()> {
        if !self.native_toggle {
            bail!("host cannot {verb} extensions");
        }
        self.command(verb, ext)?;
        if let Some(entry) = self.installed.get_mut(&ext.key()) {
            entry.1 = enabled;
        } else if !enabled {
            if !self.builtin_disabled.iter().any(|b| b.eq_ignore_ascii_case(&ext.id)) {
                self.builtin_disabled.push(ext.id.clone());
            }
        } else {
            self.builtin_disabled.retain(|b| !b.eq_ignore_ascii_case(&ext.id));
        }
        Ok(())
    }
}

impl ExtensionHost for MemoryHost {
    fn list_extensions(&self, ignored: &KeyMatcher) -> Result<ExtensionList> {
        let installed: Vec<(ExtensionId, bool)> = self.installed.values().cloned().collect();
        let mut list = partition_by_record(&installed, &self.record(), ignored);
        for b in &self.builtin_disabled {
            let builtin = list.builtin.get_or_insert_with(BuiltinExtensions::default);
            if !builtin.disabled.iter().any(|d| d.eq_ignore_ascii_case(b)) {
                builtin.disabled.push(b.clone());
            }
        }
        Ok(list)
    }

    fn install(&mut self, ext: &ExtensionId) -> Result<()> {
        self.command("install", ext)?;
        self.installed.insert(ext.key(), (ext.clone(), true));
        Ok(())
    }

    fn uninstall(&mut self, ext: &ExtensionId) -> Result<()> {
        self.command("uninstall", ext)?;
        self.installed.remove(&ext.key());
        Ok(())
    }

    fn enable(&mut self, ext: &ExtensionId) -> Result<()> {
        self.toggle("enable", ext, true)
    }

    fn disable(&mut self, ext: &ExtensionId) -> Result<()> {
        self.toggle("disable", ext, false)
    }

    fn supports_native_toggle(&self) -> bool {
        self.native_toggle
    }
}

impl StateStore for MemoryHost {
    fn read_state(&self, query: &StateQuery) -> Result<BTreeMap<String, String>> {
        Ok(self
            .state
            .iter()
            .filter(|(k, _)| query.matches(k))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    fn write_state(&mut self, upserts: &[(String, String)], deletes: &[String]) -> Result<()> {
        for key in deletes {
            self.state.remove(key);
        }
        for (key, value) in upserts {
            self.state.insert(key.clone(), value.clone());
        }
        Ok(())
    }
}

impl SessionControl for MemoryHost {
    fn confirm_restart(&mut self, decision: RestartDecision) -> Result<bool> {
        self.confirmations.push(decision);
        Ok(self.confirm)
    }

    fn trigger_restart(&mut self) -> Result<()> {
        self.restarts += 1;
        Ok(())
    }

    fn trigger_reload(&mut self) -> Result<()> {
        self.reloads += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn none() -> KeyMatcher {
        KeyMatcher::new(&[]).unwrap()
    }

    #[test]
    fn disabled_record_drives_listing_without_native_toggle() {
        let mut host = MemoryHost::new();
        host.add_extension("a.x", true);
        host.add_extension("b.y", true);
        host.set_state(
            DISABLED_RECORD_KEY,
            r#"[{"id":"B.Y"},{"id":"vscode.git"}]"#,
        );

        let list = host.list_extensions(&none()).unwrap();
        assert_eq!(list.enabled, vec![ExtensionId::new("a.x")]);
        assert_eq!(list.disabled, vec![ExtensionId::new("b.y")]);
        assert_eq!(list.builtin_disabled(), ["vscode.git".to_string()]);
    }

    #[test]
    fn ignored_extensions_are_not_listed() {
        let mut host = MemoryHost::new();
        host.add_extension("a.x", true);
        host.add_extension("ms-python.python", false);
        let ignored = KeyMatcher::case_insensitive(&["MS-python.*".into()]).unwrap();
        let list = host.list_extensions(&ignored).unwrap();
        assert_eq!(list.installed().count(), 1);
    }

    #[test]
    fn toggling_requires_native_support() {
        let mut host = MemoryHost::new();
        host.add_extension("a.x", true);
        assert!(host.disable(&ExtensionId::new("a.x")).is_err());

        let mut host = host.with_native_toggle();
        host.disable(&ExtensionId::new("a.x")).unwrap();
        assert!(host.list_extensions(&none()).unwrap().is_disabled(&ExtensionId::new("a.x")));
        assert_eq!(host.calls, vec!["disable a.x"]);
    }

    #[test]
    fn state_query_matches_prefixes_and_exact_keys() {
        let q = StateQuery {
            prefixes: vec!["workbench.".into()],
            keys: vec!["a.x".into()],
        };
        assert!(q.matches("workbench.panel"));
        assert!(q.matches("a.x"));
        assert!(!q.matches("a.xy"));
        assert!(!q.matches(DISABLED_RECORD_KEY));
    }

    #[test]
    fn malformed_record_reads_empty() {
        assert!(parse_disabled_record("not json").is_empty());
        let ids = vec![ExtensionId::new("a.x")];
        let raw = encode_disabled_record(&ids).unwrap();
        assert_eq!(parse_disabled_record(&raw), ids);
    }
}
