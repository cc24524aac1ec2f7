use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Namespace prefix of loadout's own editor settings.
pub const SETTINGS_NAMESPACE: &str = "loadout.";

/// Placeholder stored in place of the live extension-data directory.
pub const EXTENSIONS_PATH_TOKEN: &str = "${extensionsPath}";

/// Profile name (a directory name under `profiles/`).
pub type ProfileName = String;

/// UI-state rows keyed by state-store key.
pub type UiStateMap = BTreeMap<String, Value>;

/// `profiles/<name>/profile.yml`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileDoc {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extends: Option<ProfileName>,
}

// ── Extensions ──

/// One installed extension. Identity is the case-insensitive `id`;
/// `uuid` is informational (nil when unknown).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "ExtensionIdRepr")]
pub struct ExtensionId {
    pub id: String,
    pub uuid: Uuid,
}

/// On-disk shapes: old documents list bare strings, current ones records.
#[derive(Deserialize)]
#[serde(untagged)]
enum ExtensionIdRepr {
    Legacy(String),
    Record {
        id: String,
        #[serde(default)]
        uuid: Option<Uuid>,
    },
}

impl From<ExtensionIdRepr> for ExtensionId {
    fn from(repr: ExtensionIdRepr) -> Self {
        match repr {
            ExtensionIdRepr::Legacy(id) => Self::new(id),
            ExtensionIdRepr::Record { id, uuid } => Self {
                id,
                uuid: uuid.unwrap_or_else(Uuid::nil),
            },
        }
    }
}

impl ExtensionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            uuid: Uuid::nil(),
        }
    }

    pub fn with_uuid(id: impl Into<String>, uuid: Uuid) -> Self {
        Self {
            id: id.into(),
            uuid,
        }
    }

    /// Merge key: lowercased `publisher.name`.
    pub fn key(&self) -> String {
        self.id.to_ascii_lowercase()
    }

    pub fn same_as(&self, other: &ExtensionId) -> bool {
        self.id.eq_ignore_ascii_case(&other.id)
    }
}

impl PartialEq for ExtensionId {
    fn eq(&self, other: &Self) -> bool {
        self.same_as(other)
    }
}

impl Eq for ExtensionId {}

impl fmt::Display for ExtensionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuiltinExtensions {
    #[serde(default)]
    pub disabled: Vec<String>,
}

/// A full extension state (baseline) or a delta against an ancestor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionList {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub disabled: Vec<ExtensionId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub enabled: Vec<ExtensionId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub uninstall: Vec<ExtensionId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub builtin: Option<BuiltinExtensions>,
}

fn position_of(list: &[ExtensionId], ext: &ExtensionId) -> Option<usize> {
    list.iter().position(|e| e.same_as(ext))
}

impl ExtensionList {
    pub fn is_empty(&self) -> bool {
        self.disabled.is_empty()
            && self.enabled.is_empty()
            && self.uninstall.is_empty()
            && self.builtin.is_none()
    }

    pub fn is_enabled(&self, ext: &ExtensionId) -> bool {
        position_of(&self.enabled, ext).is_some()
    }

    pub fn is_disabled(&self, ext: &ExtensionId) -> bool {
        position_of(&self.disabled, ext).is_some()
    }

    pub fn contains(&self, ext: &ExtensionId) -> bool {
        self.is_enabled(ext) || self.is_disabled(ext)
    }

    /// Every installed extension, disabled first.
    pub fn installed(&self) -> impl Iterator<Item = &ExtensionId> {
        self.disabled.iter().chain(self.enabled.iter())
    }

    /// Remove `ext` from `enabled` and add it to `disabled` (idempotent).
    pub fn mark_disabled(&mut self, ext: &ExtensionId) {
        if let Some(i) = position_of(&self.enabled, ext) {
            self.enabled.remove(i);
        }
        if position_of(&self.disabled, ext).is_none() {
            self.disabled.push(ext.clone());
        }
    }

    /// Remove `ext` from `disabled` and add it to `enabled` (idempotent).
    pub fn mark_enabled(&mut self, ext: &ExtensionId) {
        if let Some(i) = position_of(&self.disabled, ext) {
            self.disabled.remove(i);
        }
        if position_of(&self.enabled, ext).is_none() {
            self.enabled.push(ext.clone());
        }
    }

    /// Remove `ext` from whichever partition holds it.
    pub fn remove(&mut self, ext: &ExtensionId) {
        self.disabled.retain(|e| !e.same_as(ext));
        self.enabled.retain(|e| !e.same_as(ext));
    }

    /// Same state with every partition ordered by id, for comparisons.
    pub fn sorted(mut self) -> Self {
        for part in [&mut self.disabled, &mut self.enabled, &mut self.uninstall] {
            part.sort_by_key(ExtensionId::key);
        }
        if let Some(b) = self.builtin.as_mut() {
            b.disabled.sort();
        }
        self
    }

    pub fn builtin_disabled(&self) -> &[String] {
        self.builtin
            .as_ref()
            .map(|b| b.disabled.as_slice())
            .unwrap_or(&[])
    }
}

// ── Resources ──

/// A sync-able category of editor state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Resource {
    Extensions,
    Keybindings,
    Settings,
    Snippets,
    UiState,
}

impl Resource {
    /// Declared order; restore processes resources in this order.
    pub const ALL: [Resource; 5] = [
        Resource::Extensions,
        Resource::Keybindings,
        Resource::Settings,
        Resource::Snippets,
        Resource::UiState,
    ];

    /// Serialize order: UI-state capture needs the extension list first.
    pub const SERIALIZE_ORDER: [Resource; 5] = [
        Resource::Extensions,
        Resource::Snippets,
        Resource::UiState,
        Resource::Keybindings,
        Resource::Settings,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Resource::Extensions => "extensions",
            Resource::Keybindings => "keybindings",
            Resource::Settings => "settings",
            Resource::Snippets => "snippets",
            Resource::UiState => "uiState",
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Resource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Resource::ALL
            .into_iter()
            .find(|r| r.as_str().eq_ignore_ascii_case(s) || (s == "ui-state" && *r == Resource::UiState))
            .ok_or_else(|| {
                format!("unknown resource {s:?} (expected extensions, keybindings, settings, snippets, uiState)")
            })
    }
}

// ── Platform ──

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Linux,
    Macos,
    Windows,
}

impl Platform {
    pub fn current() -> Self {
        match std::env::consts::OS {
            "macos" => Platform::Macos,
            "windows" => Platform::Windows,
            _ => Platform::Linux,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Linux => "linux",
            Platform::Macos => "macos",
            Platform::Windows => "windows",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "linux" => Ok(Platform::Linux),
            "macos" | "darwin" | "mac" => Ok(Platform::Macos),
            "windows" | "win32" => Ok(Platform::Windows),
            other => Err(format!("unknown platform {other:?}")),
        }
    }
}

// ── Sync policy ──

/// `.sync.yml` as stored: only explicitly-set fields are present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncSettingsDoc {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keybindings_per_platform: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ignored_extensions: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ignored_settings: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<Vec<Resource>>,
}

impl SyncSettingsDoc {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Fill every unset field from `ancestor` (a farther document).
    pub fn inherit_from(&mut self, ancestor: &SyncSettingsDoc) {
        if self.keybindings_per_platform.is_none() {
            self.keybindings_per_platform = ancestor.keybindings_per_platform;
        }
        if self.ignored_extensions.is_none() {
            self.ignored_extensions = ancestor.ignored_extensions.clone();
        }
        if self.ignored_settings.is_none() {
            self.ignored_settings = ancestor.ignored_settings.clone();
        }
        if self.resources.is_none() {
            self.resources = ancestor.resources.clone();
        }
    }
}

/// Resolved sync policy for one profile.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncSettings {
    pub keybindings_per_platform: bool,
    pub ignored_extensions: Vec<String>,
    pub ignored_settings: Vec<String>,
    pub resources: Vec<Resource>,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            keybindings_per_platform: true,
            ignored_extensions: Vec::new(),
            ignored_settings: Vec::new(),
            resources: Resource::ALL.to_vec(),
        }
    }
}

impl SyncSettings {
    pub fn from_doc(doc: &SyncSettingsDoc) -> Self {
        let defaults = Self::default();
        Self {
            keybindings_per_platform: doc
                .keybindings_per_platform
                .unwrap_or(defaults.keybindings_per_platform),
            ignored_extensions: doc
                .ignored_extensions
                .clone()
                .unwrap_or(defaults.ignored_extensions),
            ignored_settings: doc
                .ignored_settings
                .clone()
                .unwrap_or(defaults.ignored_settings),
            resources: doc.resources.clone().unwrap_or(defaults.resources),
        }
    }

    pub fn syncs(&self, resource: Resource) -> bool {
        self.resources.contains(&resource)
    }

    /// Fields whose value differs from `inherited`, as a minimal document.
    pub fn overrides_against(&self, inherited: &SyncSettings) -> SyncSettingsDoc {
        let mut doc = SyncSettingsDoc::default();
        if self.keybindings_per_platform != inherited.keybindings_per_platform {
            doc.keybindings_per_platform = Some(self.keybindings_per_platform);
        }
        if self.ignored_extensions != inherited.ignored_extensions {
            doc.ignored_extensions = Some(self.ignored_extensions.clone());
        }
        if self.ignored_settings != inherited.ignored_settings {
            doc.ignored_settings = Some(self.ignored_settings.clone());
        }
        if self.resources != inherited.resources {
            doc.resources = Some(self.resources.clone());
        }
        doc
    }

    /// Settings ignore list minus entries in loadout's own namespace.
    pub fn effective_ignored_settings(&self) -> Vec<String> {
        self.ignored_settings
            .iter()
            .filter(|k| !k.starts_with(SETTINGS_NAMESPACE))
            .cloned()
            .collect()
    }
}

// ── Diff documents ──

/// `snippets.diff.yml`: snippet files an inheriting profile dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnippetsDiff {
    #[serde(default)]
    pub removed: Vec<String>,
}

impl SnippetsDiff {
    pub fn is_empty(&self) -> bool {
        self.removed.is_empty()
    }

    pub fn removes(&self, name: &str) -> bool {
        self.removed.iter().any(|r| r == name)
    }
}

/// `ui-state.diff.yml`: changes relative to the ancestor's effective UI state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UiStateDiff {
    #[serde(default)]
    pub modified: UiStateMap,
    #[serde(default)]
    pub removed: Vec<String>,
}

impl UiStateDiff {
    pub fn is_empty(&self) -> bool {
        self.modified.is_empty() && self.removed.is_empty()
    }
}
