//! nb-core: Configuration and the logit-to-action policy shared by the bridge crates.

pub mod action;
pub mod config;

pub use action::{decode_action, ActionCommand, Logits, ACTION_THRESHOLD, LOGITS_LEN};
pub use config::{Config, ConfigError, MalformedPolicy};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
