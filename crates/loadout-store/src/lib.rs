use anyhow::Context;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Default repository root when neither `--repo` nor `LOADOUT_REPO` is given:
/// `<data_dir>/loadout/` (falls back to `~/.loadout/`).
pub fn default_repo_root() -> PathBuf {
    if let Some(data_dir) = dirs::data_dir() {
        data_dir.join("loadout")
    } else if let Some(home) = dirs::home_dir() {
        home.join(".loadout")
    } else {
        PathBuf::from(".loadout")
    }
}

/// Atomic write: write to temp file in same dir, then rename.
pub fn write_atomic(path: &Path, data: &[u8]) -> anyhow::Result<()> {
    write_with_mode(path, data, false)
}

/// Atomic write readable by the owner only (0600 on unix).
pub fn write_private(path: &Path, data: &[u8]) -> anyhow::Result<()> {
    write_with_mode(path, data, true)
}

fn write_with_mode(path: &Path, data: &[u8], private: bool) -> anyhow::Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| anyhow::anyhow!("no parent dir for {}", path.display()))?;
    fs::create_dir_all(parent)?;
    let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
    tmp.write_all(data)?;
    tmp.flush()?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = if private { 0o600 } else { 0o644 };
        fs::set_permissions(tmp.path(), fs::Permissions::from_mode(mode))?;
    }
    #[cfg(not(unix))]
    let _ = private;
    tmp.persist(path)
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

/// Read a YAML document. A missing file is `None`, not an error.
pub fn read_yaml<T: DeserializeOwned>(path: &Path) -> anyhow::Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    let content =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    if content.trim().is_empty() {
        return Ok(None);
    }
    let doc = serde_yaml::from_str(&content)
        .with_context(|| format!("parsing {}", path.display()))?;
    Ok(Some(doc))
}

/// Serialize `doc` as YAML and write it atomically.
pub fn write_yaml<T: Serialize>(path: &Path, doc: &T, private: bool) -> anyhow::Result<()> {
    let yaml = serde_yaml::to_string(doc)?;
    write_with_mode(path, yaml.as_bytes(), private)
}

/// Remove a file if present. Returns whether something was removed.
pub fn remove_file_if_exists(path: &Path) -> anyhow::Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e).with_context(|| format!("removing {}", path.display())),
    }
}

/// All regular files under `dir`, keyed by `/`-separated relative path.
/// A missing directory yields an empty map.
pub fn list_files(dir: &Path) -> anyhow::Result<BTreeMap<String, PathBuf>> {
    let mut files = BTreeMap::new();
    if !dir.is_dir() {
        return Ok(files);
    }
    for entry in walkdir::WalkDir::new(dir).follow_links(true) {
        let entry = entry.with_context(|| format!("listing {}", dir.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = entry.path().strip_prefix(dir)?;
        let name = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        files.insert(name, entry.path().to_path_buf());
    }
    Ok(files)
}

/// Remove everything inside `dir` and leave it existing and empty.
pub fn clear_dir(dir: &Path) -> anyhow::Result<()> {
    if dir.exists() {
        fs::remove_dir_all(dir).with_context(|| format!("clearing {}", dir.display()))?;
    }
    fs::create_dir_all(dir)?;
    Ok(())
}

/// Copy `src` to `dst`, creating parent directories.
pub fn copy_file(src: &Path, dst: &Path) -> anyhow::Result<()> {
    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::copy(src, dst)
        .with_context(|| format!("copying {} -> {}", src.display(), dst.display()))?;
    tracing::debug!(src = %src.display(), dst = %dst.display(), "copied");
    Ok(())
}
