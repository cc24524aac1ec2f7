use crate::config::HostConfig;
use loadout_profile::{RepoPaths, Repository};
use std::path::Path;

pub fn execute(repo_root: &Path) -> anyhow::Result<()> {
    let paths = RepoPaths::discover(repo_root);

    if paths.is_initialized() {
        println!("Already initialized at {}", paths.root.display());
        return Ok(());
    }

    Repository::init(repo_root)?;
    if !paths.config_yml.exists() {
        HostConfig::default().save(&paths.config_yml)?;
    }

    println!("Initialized profile repository at {}", paths.root.display());
    println!("  next: loadout create <name>");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        execute(tmp.path()).unwrap();
        let paths = RepoPaths::discover(tmp.path());
        assert!(paths.is_initialized());
        assert!(paths.config_yml.is_file());

        std::fs::write(&paths.config_yml, "editor_bin: codium\n").unwrap();
        execute(tmp.path()).unwrap();
        let cfg = HostConfig::load(&paths.config_yml).unwrap();
        assert_eq!(cfg.editor_bin(), "codium");
    }
}
