//! Settings and key bindings. Both live only in the root profile.

use crate::ProfileContext;
use anyhow::{Context, Result};
use loadout_core::jsonc;
use loadout_store::{copy_file, write_atomic, write_private};
use std::path::Path;
use tracing::debug;

fn read_optional(path: &Path) -> Result<Option<String>> {
    match std::fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e).with_context(|| format!("reading {}", path.display())),
    }
}

/// Store the live settings without ignored properties or comments.
/// Returns `false` when the editor has no settings file.
pub fn serialize_settings(ctx: &ProfileContext<'_>) -> Result<bool> {
    let live_path = ctx.live.settings_json();
    let Some(live) = read_optional(&live_path)? else {
        return Ok(false);
    };
    let ignored = ctx.ignored_settings()?;
    let kept = jsonc::remove_properties(&jsonc::normalize(&live)?, |k| ignored.is_match(k))
        .with_context(|| format!("editing {}", live_path.display()))?;
    let stored = jsonc::strip_comments(&kept)?;
    write_private(&ctx.root_paths().settings_json, stored.as_bytes())?;
    debug!(profile = ctx.leaf(), "settings serialized");
    Ok(true)
}

/// Merge the stored settings with the live machine's ignored properties.
///
/// Ignored keys always come from the live file; a stale copy in the stored
/// document is dropped. Returns `false` when nothing is stored.
pub fn restore_settings(ctx: &ProfileContext<'_>) -> Result<bool> {
    let Some(stored) = read_optional(&ctx.root_paths().settings_json)? else {
        return Ok(false);
    };
    let live_path = ctx.live.settings_json();
    let live = read_optional(&live_path)?.unwrap_or_default();
    let live = jsonc::normalize(&live).with_context(|| format!("parsing {}", live_path.display()))?;

    let ignored = ctx.ignored_settings()?;
    let keep = jsonc::extract_properties(&live, |k| ignored.is_match(k))?;
    let base = jsonc::remove_properties(&jsonc::normalize(&stored)?, |k| ignored.is_match(k))?;
    let merged = jsonc::upsert_properties(&base, &keep)?;

    write_atomic(&live_path, merged.as_bytes())?;
    debug!(profile = ctx.leaf(), kept = keep.len(), "settings restored");
    Ok(true)
}

pub fn serialize_keybindings(ctx: &ProfileContext<'_>) -> Result<bool> {
    let live = ctx.live.keybindings_json();
    if !live.is_file() {
        return Ok(false);
    }
    copy_file(&live, &ctx.stored_keybindings())?;
    Ok(true)
}

pub fn restore_keybindings(ctx: &ProfileContext<'_>) -> Result<bool> {
    let stored = ctx.stored_keybindings();
    if !stored.is_file() {
        return Ok(false);
    }
    copy_file(&stored, &ctx.live.keybindings_json())?;
    Ok(true)
}
