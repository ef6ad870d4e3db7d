//! nb-features: Feature schema, extraction and the temporal window fed to the model.

pub mod extract;
pub mod schema;
pub mod window;

pub use extract::{encode_frame_v1, FeatureExtractor, FeatureVector, GameStateExtractor};
pub use schema::{F, FEATURE_SCHEMA_ID, WINDOW_LEN};
pub use window::{FeatureWindow, WindowError};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
