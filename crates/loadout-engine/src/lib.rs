pub mod context;
pub mod extensions;
pub mod host;
pub mod inspect;
pub mod restore;
pub mod serialize;
pub mod settings;
pub mod snippets;
pub mod ui_state;

pub use context::{LiveEnvironment, ProfileContext};
pub use extensions::{ActionOutcome, ActionResult, ExtensionAction, ReconcilePlan};
pub use host::{
    encode_disabled_record, parse_disabled_record, partition_by_record, ExtensionHost, Host,
    MemoryHost, RestartDecision, SessionControl, StateQuery, StateStore, DISABLED_RECORD_KEY,
};
pub use inspect::{summarize, ProfileSummary};
pub use restore::{plan_restore, restore_profile, RestoreOutcome, RestorePlan, RestoreReport};
pub use serialize::{serialize_profile, SerializeReport, SkipReason};
