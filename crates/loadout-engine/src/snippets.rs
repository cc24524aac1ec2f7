//! Snippet files: hash-indexed inheritance with an explicit removal list.

use anyhow::{Context, Result};
use loadout_core::{sha256_file, HashIndex, SnippetsDiff};
use loadout_profile::{ProfileChain, Repository};
use loadout_store::{clear_dir, copy_file, list_files};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Source file of every snippet visible from the leaf of `chain`.
///
/// Each level drops what its diff removes, then overlays its own files.
pub fn effective_snippet_files(repo: &Repository, chain: &ProfileChain) -> Result<BTreeMap<String, PathBuf>> {
    let mut files = BTreeMap::new();
    for name in chain.oldest_first() {
        let diff = repo.read_snippets_diff(name)?;
        files.retain(|file: &String, _| !diff.removes(file));
        files.extend(list_files(&repo.profile(name).snippets_dir)?);
    }
    Ok(files)
}

pub fn effective_snippet_index(repo: &Repository, chain: &ProfileChain) -> Result<HashIndex> {
    let files = effective_snippet_files(repo, chain)?;
    HashIndex::from_files(&files).context("hash snippet files")
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnippetsSaved {
    pub copied: Vec<String>,
    pub removed: Vec<String>,
}

/// Store the live snippets directory into the leaf profile.
///
/// A root profile keeps every file. An inheriting profile keeps only files
/// whose content differs from the parent's, and records parent files that
/// are gone.
pub fn serialize_snippets(repo: &Repository, chain: &ProfileChain, live_dir: &Path) -> Result<SnippetsSaved> {
    let live = list_files(live_dir)?;
    let parent = match chain.parent_chain() {
        Some(parent) => effective_snippet_index(repo, &parent)?,
        None => HashIndex::new(),
    };

    let own_dir = repo.profile(chain.leaf()).snippets_dir;
    clear_dir(&own_dir)?;

    let mut saved = SnippetsSaved::default();
    for (name, path) in &live {
        let digest = sha256_file(path).with_context(|| format!("hash {}", path.display()))?;
        if parent.get(name) == Some(digest.as_str()) {
            continue;
        }
        copy_file(path, &own_dir.join(name))?;
        saved.copied.push(name.clone());
    }
    saved.removed = parent
        .names()
        .filter(|name| !live.contains_key(name.as_str()))
        .cloned()
        .collect();

    repo.store_snippets_diff(
        chain.leaf(),
        &SnippetsDiff {
            removed: saved.removed.clone(),
        },
    )?;
    debug!(
        profile = chain.leaf(),
        copied = saved.copied.len(),
        removed = saved.removed.len(),
        "snippets serialized"
    );
    Ok(saved)
}

/// Replace the live snippets directory with the profile's effective files.
pub fn restore_snippets(repo: &Repository, chain: &ProfileChain, live_dir: &Path) -> Result<usize> {
    let files = effective_snippet_files(repo, chain)?;
    clear_dir(live_dir)?;
    for (name, src) in &files {
        copy_file(src, &live_dir.join(name))?;
    }
    debug!(profile = chain.leaf(), files = files.len(), "snippets restored");
    Ok(files.len())
}
