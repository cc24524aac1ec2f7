use anyhow::Context;
use loadout_engine::StateQuery;
use rusqlite::types::ValueRef;
use rusqlite::{params, Connection};
use std::collections::BTreeMap;
use std::path::PathBuf;

const SCHEMA_SQL: &str =
    "CREATE TABLE IF NOT EXISTS ItemTable (key TEXT UNIQUE ON CONFLICT REPLACE, value BLOB)";

/// The editor's global `state.vscdb` (a single `ItemTable` of key/value rows).
#[derive(Debug, Clone)]
pub struct StateDb {
    path: PathBuf,
}

impl StateDb {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn open(&self) -> anyhow::Result<Connection> {
        let conn = Connection::open(&self.path)
            .with_context(|| format!("opening {}", self.path.display()))?;
        conn.execute_batch("PRAGMA busy_timeout = 5000;")?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(conn)
    }

    /// Rows matching `query`. A missing database has no rows.
    pub fn read(&self, query: &StateQuery) -> anyhow::Result<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let conn = self.open()?;
        let mut stmt = conn.prepare("SELECT key, value FROM ItemTable")?;
        let rows: Vec<(String, String)> = stmt
            .query_map([], |row| {
                let value = match row.get_ref(1)? {
                    ValueRef::Text(t) | ValueRef::Blob(t) => String::from_utf8_lossy(t).into_owned(),
                    ValueRef::Integer(i) => i.to_string(),
                    ValueRef::Real(f) => f.to_string(),
                    ValueRef::Null => String::new(),
                };
                Ok((row.get(0)?, value))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows.into_iter().filter(|(k, _)| query.matches(k)).collect())
    }

    /// Apply deletes then upserts in one transaction.
    pub fn write(&self, upserts: &[(String, String)], deletes: &[String]) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut conn = self.open()?;
        let tx = conn.transaction()?;
        for key in deletes {
            tx.execute("DELETE FROM ItemTable WHERE key = ?1", params![key])?;
        }
        for (key, value) in upserts {
            tx.execute(
                "INSERT OR REPLACE INTO ItemTable (key, value) VALUES (?1, ?2)",
                params![key, value],
            )?;
        }
        tx.commit()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_database_reads_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let db = StateDb::new(tmp.path().join("state.vscdb"));
        assert!(db.read(&StateQuery::default()).unwrap().is_empty());
        assert!(!tmp.path().join("state.vscdb").exists());
    }

    #[test]
    fn write_then_read_filtered() {
        let tmp = tempfile::tempdir().unwrap();
        let db = StateDb::new(tmp.path().join("globalStorage").join("state.vscdb"));
        db.write(
            &[
                ("workbench.panel".into(), "bottom".into()),
                ("other.key".into(), "x".into()),
                ("a.x".into(), "{\"k\":1}".into()),
            ],
            &[],
        )
        .unwrap();

        let query = StateQuery {
            prefixes: vec!["workbench.".into()],
            keys: vec!["a.x".into()],
        };
        let rows = db.read(&query).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows["workbench.panel"], "bottom");

        db.write(&[("workbench.panel".into(), "right".into())], &["a.x".into()])
            .unwrap();
        let rows = db.read(&query).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows["workbench.panel"], "right");
    }

    #[test]
    fn blob_values_read_as_text() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("state.vscdb");
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(SCHEMA_SQL).unwrap();
        conn.execute(
            "INSERT INTO ItemTable (key, value) VALUES ('window.state', ?1)",
            params![b"maximized".to_vec()],
        )
        .unwrap();
        drop(conn);

        let rows = StateDb::new(&path).read(&StateQuery {
            prefixes: vec!["window.".into()],
            keys: Vec::new(),
        });
        assert_eq!(rows.unwrap()["window.state"], "maximized");
    }
}
