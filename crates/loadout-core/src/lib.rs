pub mod error;
pub mod hash;
pub mod jsonc;
pub mod pattern;
pub mod types;

pub use error::{JsoncError, ProfileError};
pub use hash::{sha256_file, sha256_hex, HashIndex};
pub use pattern::KeyMatcher;
pub use types::*;
