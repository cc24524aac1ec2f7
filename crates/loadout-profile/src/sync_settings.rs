use crate::chain::ProfileChain;
use crate::repository::Repository;
use loadout_core::{ProfileError, SyncSettings, SyncSettingsDoc};
use tracing::debug;

/// What `save_sync_settings` did with the leaf's override document.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncSettingsSaved {
    Written(SyncSettingsDoc),
    Removed,
}

/// Resolve the sync policy for the leaf of `chain`.
///
/// Each field comes from the nearest profile that sets it; unset fields take
/// the defaults. At least one document must exist along the chain.
pub fn load_sync_settings(repo: &Repository, chain: &ProfileChain) -> anyhow::Result<SyncSettings> {
    let mut merged = SyncSettingsDoc::default();
    let mut found = false;
    for name in chain.iter() {
        if let Some(doc) = repo.read_sync_settings_doc(name)? {
            debug!(profile = name, "sync settings document found");
            merged.inherit_from(&doc);
            found = true;
        }
    }
    if !found {
        return Err(ProfileError::SyncSettingsNotFound(chain.leaf().to_string()).into());
    }
    Ok(SyncSettings::from_doc(&merged))
}

/// Persist `settings` for the leaf of `chain`, writing only the fields that
/// differ from what the leaf would inherit. An inheriting profile with no
/// differences loses its override document.
pub fn save_sync_settings(
    repo: &Repository,
    chain: &ProfileChain,
    settings: &SyncSettings,
) -> anyhow::Result<SyncSettingsSaved> {
    let inherited = match chain.parent_chain() {
        Some(parent) => match load_sync_settings(repo, &parent) {
            Ok(s) => Some(s),
            Err(e) if matches!(
                e.downcast_ref::<ProfileError>(),
                Some(ProfileError::SyncSettingsNotFound(_))
            ) =>
            {
                None
            }
            Err(e) => return Err(e),
        },
        None => None,
    };

    let leaf = chain.leaf();
    match inherited {
        Some(inherited) => {
            let doc = settings.overrides_against(&inherited);
            if doc.is_empty() {
                repo.remove_sync_settings_doc(leaf)?;
                Ok(SyncSettingsSaved::Removed)
            } else {
                repo.write_sync_settings_doc(leaf, &doc)?;
                Ok(SyncSettingsSaved::Written(doc))
            }
        }
        None => {
            // Nothing to inherit from: this document terminates the chain,
            // so it is kept even when every field is at its default.
            let doc = settings.overrides_against(&SyncSettings::default());
            repo.write_sync_settings_doc(leaf, &doc)?;
            Ok(SyncSettingsSaved::Written(doc))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loadout_core::Resource;

    fn setup() -> (tempfile::TempDir, Repository) {
        let tmp = tempfile::tempdir().unwrap();
        let repo = Repository::init(tmp.path()).unwrap();
        repo.create_profile("base", None).unwrap();
        repo.create_profile("work", Some("base")).unwrap();
        (tmp, repo)
    }

    #[test]
    fn child_inherits_parent_policy() {
        let (_tmp, repo) = setup();
        let base = SyncSettingsDoc {
            ignored_settings: Some(vec!["window.zoomLevel".into()]),
            ..Default::default()
        };
        repo.write_sync_settings_doc("base", &base).unwrap();

        let chain = ProfileChain::resolve(&repo, "work").unwrap();
        let settings = load_sync_settings(&repo, &chain).unwrap();
        assert_eq!(settings.ignored_settings, vec!["window.zoomLevel".to_string()]);
        assert!(settings.keybindings_per_platform);
    }

    #[test]
    fn child_field_overrides_parent() {
        let (_tmp, repo) = setup();
        repo.write_sync_settings_doc(
            "work",
            &SyncSettingsDoc {
                resources: Some(vec![Resource::Extensions]),
                ..Default::default()
            },
        )
        .unwrap();
        let chain = ProfileChain::resolve(&repo, "work").unwrap();
        let settings = load_sync_settings(&repo, &chain).unwrap();
        assert_eq!(settings.resources, vec![Resource::Extensions]);
    }

    #[test]
    fn missing_everywhere_is_fatal() {
        let (_tmp, repo) = setup();
        std::fs::remove_file(repo.profile("base").sync_yml).unwrap();
        let chain = ProfileChain::resolve(&repo, "work").unwrap();
        let err = load_sync_settings(&repo, &chain).unwrap_err();
        assert!(err.to_string().contains("can not be found"));
    }

    #[test]
    fn legacy_config_yml_is_honored() {
        let (_tmp, repo) = setup();
        let base = repo.profile("base");
        std::fs::remove_file(&base.sync_yml).unwrap();
        std::fs::write(&base.legacy_sync_yml, "keybindingsPerPlatform: false\n").unwrap();
        let chain = ProfileChain::resolve(&repo, "base").unwrap();
        assert!(!load_sync_settings(&repo, &chain).unwrap().keybindings_per_platform);
    }

    #[test]
    fn save_writes_only_differences() {
        let (_tmp, repo) = setup();
        let chain = ProfileChain::resolve(&repo, "work").unwrap();
        let mut settings = load_sync_settings(&repo, &chain).unwrap();
        settings.ignored_extensions = vec!["ms-vscode.*".into()];

        let saved = save_sync_settings(&repo, &chain, &settings).unwrap();
        match saved {
            SyncSettingsSaved::Written(doc) => {
                assert_eq!(doc.ignored_extensions, Some(vec!["ms-vscode.*".to_string()]));
                assert!(doc.resources.is_none());
                assert!(doc.keybindings_per_platform.is_none());
            }
            other => panic!("expected write, got {other:?}"),
        }
        assert_eq!(load_sync_settings(&repo, &chain).unwrap(), settings);
    }

    #[test]
    fn save_without_differences_removes_override() {
        let (_tmp, repo) = setup();
        let chain = ProfileChain::resolve(&repo, "work").unwrap();
        repo.write_sync_settings_doc(
            "work",
            &SyncSettingsDoc {
                keybindings_per_platform: Some(true),
                ..Default::default()
            },
        )
        .unwrap();
        let settings = load_sync_settings(&repo, &chain).unwrap();
        let saved = save_sync_settings(&repo, &chain, &settings).unwrap();
        assert_eq!(saved, SyncSettingsSaved::Removed);
        assert!(!repo.profile("work").sync_yml.exists());
    }

    #[test]
    fn root_document_is_kept_even_at_defaults() {
        let (_tmp, repo) = setup();
        let chain = ProfileChain::resolve(&repo, "base").unwrap();
        let saved = save_sync_settings(&repo, &chain, &SyncSettings::default()).unwrap();
        assert_eq!(saved, SyncSettingsSaved::Written(SyncSettingsDoc::default()));
        assert!(repo.profile("base").sync_yml.is_file());
    }
}
