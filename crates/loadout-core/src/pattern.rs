use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

/// Matches setting keys or extension ids against an ignore list of globs.
///
/// `*` spans dots, so `terminal.integrated.*` covers every nested key.
#[derive(Debug, Clone)]
pub struct KeyMatcher {
    set: GlobSet,
    empty: bool,
}

impl KeyMatcher {
    /// Case-sensitive matcher (setting keys).
    pub fn new(patterns: &[String]) -> anyhow::Result<Self> {
        Self::build(patterns, false)
    }

    /// Case-insensitive matcher (extension ids).
    pub fn case_insensitive(patterns: &[String]) -> anyhow::Result<Self> {
        Self::build(patterns, true)
    }

    fn build(patterns: &[String], case_insensitive: bool) -> anyhow::Result<Self> {
        let mut builder = GlobSetBuilder::new();
        for pat in patterns {
            let glob = GlobBuilder::new(pat)
                .case_insensitive(case_insensitive)
                .literal_separator(false)
                .build()
                .map_err(|e| anyhow::anyhow!("invalid ignore pattern {pat:?}: {e}"))?;
            builder.add(glob);
        }
        Ok(Self {
            set: builder.build()?,
            empty: patterns.is_empty(),
        })
    }

    pub fn is_match(&self, key: &str) -> bool {
        !self.empty && self.set.is_match(key)
    }

    pub fn is_empty(&self) -> bool {
        self.empty
    }
}
