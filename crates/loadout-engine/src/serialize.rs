//! Capture the live editor into a profile.

use crate::extensions::stored_extensions;
use crate::host::Host;
use crate::settings::{serialize_keybindings, serialize_settings};
use crate::snippets::{serialize_snippets, SnippetsSaved};
use crate::ui_state::{self, Redactor};
use crate::{LiveEnvironment, ProfileContext};
use anyhow::Result;
use loadout_core::{ExtensionList, Resource};
use loadout_profile::Repository;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Not in the profile's `resources`.
    NotSynced,
    /// Settings and key bindings are stored by the root profile only.
    Inherited,
    /// The editor has no such file.
    Missing,
}

#[derive(Debug, Clone, Default)]
pub struct SerializeReport {
    pub profile: String,
    pub saved: Vec<Resource>,
    pub skipped: Vec<(Resource, SkipReason)>,
    /// Stored extension document (a delta for inheriting profiles).
    pub extensions: Option<ExtensionList>,
    pub snippets: Option<SnippetsSaved>,
    pub ui_state_keys: usize,
}

pub fn serialize_profile(
    repo: &Repository,
    live: &LiveEnvironment,
    name: &str,
    host: &dyn Host,
) -> Result<SerializeReport> {
    let ctx = ProfileContext::load(repo, live, name)?;
    let mut report = SerializeReport {
        profile: name.to_string(),
        ..Default::default()
    };

    let live_extensions = if ctx.settings.syncs(Resource::Extensions) || ctx.settings.syncs(Resource::UiState) {
        host.list_extensions(&ctx.ignored_extensions()?)?
    } else {
        ExtensionList::default()
    };

    for resource in Resource::SERIALIZE_ORDER {
        if !ctx.settings.syncs(resource) {
            report.skipped.push((resource, SkipReason::NotSynced));
            continue;
        }
        let inherited = ctx.chain.is_inheriting();
        let saved = match resource {
            Resource::Extensions => {
                let doc = stored_extensions(repo, &ctx.chain, &live_extensions)?;
                repo.write_extensions(ctx.leaf(), &doc)?;
                report.extensions = Some(doc);
                true
            }
            Resource::Snippets => {
                report.snippets = Some(serialize_snippets(repo, &ctx.chain, &live.snippets_dir())?);
                true
            }
            Resource::UiState => {
                let live_state = ui_state::read_live_state(host, &live_extensions)?;
                let captured = ui_state::capture(&live_state, &Redactor::new(live));
                report.ui_state_keys = ui_state::serialize_ui_state(repo, &ctx.chain, &captured)?;
                true
            }
            Resource::Keybindings | Resource::Settings if inherited => {
                report.skipped.push((resource, SkipReason::Inherited));
                continue;
            }
            Resource::Keybindings => serialize_keybindings(&ctx)?,
            Resource::Settings => serialize_settings(&ctx)?,
        };
        if saved {
            report.saved.push(resource);
        } else {
            report.skipped.push((resource, SkipReason::Missing));
        }
    }

    info!(profile = name, chain = %ctx.chain, saved = report.saved.len(), "profile serialized");
    Ok(report)
}
