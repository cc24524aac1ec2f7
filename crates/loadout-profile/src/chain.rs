use crate::repository::Repository;
use loadout_core::ProfileError;
use std::collections::HashSet;

/// A profile and its `extends` ancestors, resolved once up front.
///
/// Stored leaf first: `names[0]` is the requested profile, the last entry is
/// the root ancestor (the one without `extends`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileChain {
    names: Vec<String>,
}

impl ProfileChain {
    /// Follow `extends` links from `name` to the root. Fails on a missing
    /// profile anywhere along the way or on a cycle.
    pub fn resolve(repo: &Repository, name: &str) -> anyhow::Result<Self> {
        let mut names = Vec::new();
        let mut seen = HashSet::new();
        let mut current = name.to_string();
        loop {
            let doc = repo.load_profile(&current)?;
            seen.insert(current.clone());
            names.push(current);
            match doc.extends {
                None => break,
                Some(parent) if seen.contains(&parent) => {
                    let mut chain = names;
                    chain.push(parent);
                    return Err(ProfileError::CyclicInheritance { chain }.into());
                }
                Some(parent) => current = parent,
            }
        }
        Ok(Self { names })
    }

    pub fn leaf(&self) -> &str {
        &self.names[0]
    }

    /// The non-inheriting ancestor whose baselines back key bindings and settings.
    pub fn root(&self) -> &str {
        &self.names[self.names.len() - 1]
    }

    pub fn parent(&self) -> Option<&str> {
        self.names.get(1).map(String::as_str)
    }

    pub fn is_inheriting(&self) -> bool {
        self.names.len() > 1
    }

    /// The chain starting at the parent, if any.
    pub fn parent_chain(&self) -> Option<ProfileChain> {
        if self.is_inheriting() {
            Some(Self {
                names: self.names[1..].to_vec(),
            })
        } else {
            None
        }
    }

    /// Leaf first.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// Root first: the order in which diffs are replayed.
    pub fn oldest_first(&self) -> impl Iterator<Item = &str> {
        self.iter().rev()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl std::fmt::Display for ProfileChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.names.join(" -> "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loadout_core::ProfileDoc;
    use loadout_store::write_yaml;

    fn repo() -> (tempfile::TempDir, Repository) {
        let tmp = tempfile::tempdir().unwrap();
        let repo = Repository::init(tmp.path()).unwrap();
        (tmp, repo)
    }

    #[test]
    fn three_level_chain() {
        let (_tmp, repo) = repo();
        repo.create_profile("a", None).unwrap();
        repo.create_profile("b", Some("a")).unwrap();
        repo.create_profile("c", Some("b")).unwrap();

        let chain = ProfileChain::resolve(&repo, "c").unwrap();
        assert_eq!(chain.leaf(), "c");
        assert_eq!(chain.parent(), Some("b"));
        assert_eq!(chain.root(), "a");
        assert_eq!(chain.oldest_first().collect::<Vec<_>>(), vec!["a", "b", "c"]);
        assert_eq!(chain.parent_chain().unwrap().leaf(), "b");
        assert_eq!(chain.to_string(), "c -> b -> a");
    }

    #[test]
    fn standalone_profile_is_its_own_root() {
        let (_tmp, repo) = repo();
        repo.create_profile("solo", None).unwrap();
        let chain = ProfileChain::resolve(&repo, "solo").unwrap();
        assert!(!chain.is_inheriting());
        assert_eq!(chain.root(), "solo");
        assert!(chain.parent_chain().is_none());
    }

    #[test]
    fn cycle_is_reported_not_followed() {
        let (_tmp, repo) = repo();
        repo.create_profile("a", None).unwrap();
        repo.create_profile("b", Some("a")).unwrap();
        // Rewire a -> b by hand; create_profile cannot produce a cycle.
        let doc = ProfileDoc {
            extends: Some("b".into()),
        };
        write_yaml(&repo.profile("a").profile_yml, &doc, false).unwrap();

        let err = ProfileChain::resolve(&repo, "b").unwrap_err();
        match err.downcast_ref::<ProfileError>() {
            Some(ProfileError::CyclicInheritance { chain }) => {
                assert_eq!(chain, &vec!["b".to_string(), "a".into(), "b".into()]);
            }
            other => panic!("expected cycle error, got {other:?}"),
        }
    }

    #[test]
    fn self_reference_is_a_cycle() {
        let (_tmp, repo) = repo();
        repo.create_profile("a", None).unwrap();
        let doc = ProfileDoc {
            extends: Some("a".into()),
        };
        write_yaml(&repo.profile("a").profile_yml, &doc, false).unwrap();
        assert!(ProfileChain::resolve(&repo, "a").is_err());
    }

    #[test]
    fn missing_ancestor_is_fatal() {
        let (_tmp, repo) = repo();
        repo.create_profile("a", None).unwrap();
        let doc = ProfileDoc {
            extends: Some("gone".into()),
        };
        write_yaml(&repo.profile("a").profile_yml, &doc, false).unwrap();
        let err = ProfileChain::resolve(&repo, "a").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ProfileError>(),
            Some(ProfileError::ProfileNotFound(name)) if name == "gone"
        ));
    }
}
