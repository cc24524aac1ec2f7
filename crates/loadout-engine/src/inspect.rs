use crate::extensions::effective_extensions;
use crate::snippets::effective_snippet_files;
use crate::ui_state::effective_ui_state;
use crate::ProfileContext;
use anyhow::Result;
use loadout_core::{ExtensionList, SyncSettings};
use loadout_profile::ProfileChain;

/// Effective view of a profile after inheritance.
#[derive(Debug, Clone)]
pub struct ProfileSummary {
    pub chain: ProfileChain,
    pub settings: SyncSettings,
    pub extensions: ExtensionList,
    pub snippets: Vec<String>,
    pub ui_state_keys: usize,
    pub has_settings: bool,
}

pub fn summarize(ctx: &ProfileContext<'_>) -> Result<ProfileSummary> {
    Ok(ProfileSummary {
        chain: ctx.chain.clone(),
        settings: ctx.settings.clone(),
        extensions: effective_extensions(ctx.repo, &ctx.chain)?,
        snippets: effective_snippet_files(ctx.repo, &ctx.chain)?.into_keys().collect(),
        ui_state_keys: effective_ui_state(ctx.repo, &ctx.chain)?.len(),
        has_settings: ctx.root_paths().settings_json.is_file(),
    })
}
