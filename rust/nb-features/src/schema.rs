//! Feature schema v1.
//!
//! One vector per received frame, from the local player's point of view.
//!
//! ### Layout (v1)
//! - **position**: 2 floats, x / POS_NORM, y / POS_NORM
//! - **displacement**: 2 floats, movement since the previous frame / POS_NORM
//!   (zero on the first frame of a session)
//! - **kill_cooldown_norm**: 1 float, kill_cooldown / KILL_COOLDOWN_NORM
//! - **is_impostor**: 1 float, 1.0 or 0.0
//! - **body_direction**: 2 floats, unit direction to the nearest dead body
//! - **doors**: 3 slots × (rel_x, rel_y, path_len), all / POS_NORM, nearest first,
//!   missing slots zero
//! - **vents**: 3 slots, same layout as doors
//!
//! Total: F = 26.
//!
//! `is_dead` is not encoded. A dead player's frames still flow through the
//! window unchanged; the model sees the same layout for both states.

/// Increment this whenever the feature layout changes.
pub const FEATURE_SCHEMA_ID: u32 = 1;

/// Feature vector length for schema v1.
pub const F: usize = 26;

/// Normalization scale for map coordinates and path lengths.
pub const POS_NORM: f32 = 50.0;

/// Normalization scale for the kill cooldown in seconds.
pub const KILL_COOLDOWN_NORM: f32 = 60.0;

/// Slots reserved per usable kind.
pub const USABLE_SLOTS: usize = 3;

/// Default number of time steps seen by the model.
pub const WINDOW_LEN: usize = 10;
