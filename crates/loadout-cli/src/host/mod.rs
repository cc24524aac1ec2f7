//! The real editor: its command line, its state database, and the terminal.

mod code_cli;
mod session;
mod state_db;

pub use code_cli::CodeCli;
pub use session::TerminalSession;
pub use state_db::StateDb;

use crate::config::HostConfig;
use anyhow::{bail, Result};
use loadout_core::{ExtensionId, ExtensionList, KeyMatcher};
use loadout_engine::{
    parse_disabled_record, partition_by_record, ExtensionHost, RestartDecision, SessionControl,
    StateQuery, StateStore, DISABLED_RECORD_KEY,
};
use std::collections::BTreeMap;

pub struct EditorHost {
    cli: CodeCli,
    db: StateDb,
    session: TerminalSession,
}

impl EditorHost {
    pub fn from_config(config: &HostConfig, assume_yes: bool) -> Result<Self> {
        Ok(Self {
            cli: CodeCli::new(config.editor_bin()),
            db: StateDb::new(config.state_db()?),
            session: TerminalSession {
                assume_yes,
                restart_command: config.restart_command.clone(),
                reload_command: config.reload_command.clone(),
            },
        })
    }

    fn disabled_record(&self) -> Result<Vec<ExtensionId>> {
        let query = StateQuery {
            prefixes: Vec::new(),
            keys: vec![DISABLED_RECORD_KEY.to_string()],
        };
        Ok(self
            .db
            .read(&query)?
            .get(DISABLED_RECORD_KEY)
            .map(|raw| parse_disabled_record(raw))
            .unwrap_or_default())
    }
}

impl ExtensionHost for EditorHost {
    fn list_extensions(&self, ignored: &KeyMatcher) -> Result<ExtensionList> {
        let installed: Vec<(ExtensionId, bool)> = self
            .cli
            .list_installed()?
            .into_iter()
            .map(|ext| (ext, true))
            .collect();
        Ok(partition_by_record(&installed, &self.disabled_record()?, ignored))
    }

    fn install(&mut self, ext: &ExtensionId) -> Result<()> {
        self.cli.install(ext)
    }

    fn uninstall(&mut self, ext: &ExtensionId) -> Result<()> {
        self.cli.uninstall(ext)
    }

    fn enable(&mut self, ext: &ExtensionId) -> Result<()> {
        bail!("the editor command line cannot enable {ext}")
    }

    fn disable(&mut self, ext: &ExtensionId) -> Result<()> {
        bail!("the editor command line cannot disable {ext}")
    }

    fn supports_native_toggle(&self) -> bool {
        false
    }
}

impl StateStore for EditorHost {
    fn read_state(&self, query: &StateQuery) -> Result<BTreeMap<String, String>> {
        self.db.read(query)
    }

    fn write_state(&mut self, upserts: &[(String, String)], deletes: &[String]) -> Result<()> {
        self.db.write(upserts, deletes)
    }
}

impl SessionControl for EditorHost {
    fn confirm_restart(&mut self, decision: RestartDecision) -> Result<bool> {
        self.session.confirm(decision)
    }

    fn trigger_restart(&mut self) -> Result<()> {
        self.session.restart()
    }

    fn trigger_reload(&mut self) -> Result<()> {
        self.session.reload()
    }
}
