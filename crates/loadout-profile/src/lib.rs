pub mod chain;
pub mod paths;
pub mod repository;
pub mod sync_settings;

pub use chain::ProfileChain;
pub use paths::{ProfilePaths, RepoPaths};
pub use repository::Repository;
pub use sync_settings::{load_sync_settings, save_sync_settings, SyncSettingsSaved};
