use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::Path;

/// Compute SHA-256 hash of bytes, returning lowercase hex string.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// SHA-256 of a file's contents.
pub fn sha256_file(path: &Path) -> std::io::Result<String> {
    let bytes = std::fs::read(path)?;
    Ok(sha256_hex(&bytes))
}

/// Content digests keyed by file name relative to a snippets directory.
///
/// Iteration is ordered by name, so two indexes over the same content
/// compare equal regardless of enumeration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HashIndex {
    entries: BTreeMap<String, String>,
}

impl HashIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hash every `(name, path)` pair.
    pub fn from_files<'a, I>(files: I) -> std::io::Result<Self>
    where
        I: IntoIterator<Item = (&'a String, &'a std::path::PathBuf)>,
    {
        let mut index = Self::new();
        for (name, path) in files {
            index.insert(name.clone(), sha256_file(path)?);
        }
        Ok(index)
    }

    pub fn insert(&mut self, name: String, digest: String) {
        self.entries.insert(name, digest);
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.entries.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_empty() {
        let h = sha256_hex(b"");
        assert_eq!(
            h,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn file_digest_matches_bytes() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("rust.json");
        std::fs::write(&path, b"hello").unwrap();
        assert_eq!(
            sha256_file(&path).unwrap(),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[test]
    fn index_equality_ignores_insertion_order() {
        let mut a = HashIndex::new();
        a.insert("b.json".into(), "2".into());
        a.insert("a.json".into(), "1".into());
        let mut b = HashIndex::new();
        b.insert("a.json".into(), "1".into());
        b.insert("b.json".into(), "2".into());
        assert_eq!(a, b);
        assert_eq!(a.names().next().map(String::as_str), Some("a.json"));
    }

    #[test]
    fn from_files_hashes_each_entry() {
        let tmp = tempfile::tempdir().unwrap();
        let p1 = tmp.path().join("one.code-snippets");
        let p2 = tmp.path().join("two.code-snippets");
        std::fs::write(&p1, b"{}").unwrap();
        std::fs::write(&p2, b"{}").unwrap();
        let files: BTreeMap<String, std::path::PathBuf> = [
            ("one.code-snippets".to_string(), p1),
            ("two.code-snippets".to_string(), p2),
        ]
        .into_iter()
        .collect();
        let index = HashIndex::from_files(&files).unwrap();
        assert_eq!(index.len(), 2);
        assert_eq!(index.get("one.code-snippets"), index.get("two.code-snippets"));
    }
}
