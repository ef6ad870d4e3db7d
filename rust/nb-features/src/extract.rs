//! Frame → feature vector extraction.

use nb_proto::{NearbyUsable, StateFrame, Vec2};

use crate::schema::{F, KILL_COOLDOWN_NORM, POS_NORM, USABLE_SLOTS};

/// One time step of derived game state.
pub type FeatureVector = Vec<f32>;

/// Stateful conversion of decoded frames into feature vectors.
///
/// A fresh instance is used for every session.
pub trait FeatureExtractor {
    /// Fold one frame into the extractor state.
    fn update(&mut self, frame: &StateFrame);

    /// Features for the most recent frame. All zeros before the first update.
    fn current_feature_vector(&self) -> FeatureVector;

    /// Length of every vector this extractor produces.
    fn feature_dim(&self) -> usize;
}

/// Reference extractor for schema v1.
#[derive(Debug, Clone, Default)]
pub struct GameStateExtractor {
    last: Option<StateFrame>,
    prev_position: Option<Vec2>,
}

impl GameStateExtractor {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FeatureExtractor for GameStateExtractor {
    fn update(&mut self, frame: &StateFrame) {
        self.prev_position = self.last.as_ref().map(|f| f.position);
        self.last = Some(frame.clone());
    }

    fn current_feature_vector(&self) -> FeatureVector {
        match &self.last {
            Some(frame) => encode_frame_v1(frame, self.prev_position).to_vec(),
            None => vec![0.0; F],
        }
    }

    fn feature_dim(&self) -> usize {
        F
    }
}

fn push_scalar(out: &mut [f32], offset: &mut usize, v: f32) {
    out[*offset] = v;
    *offset += 1;
}

fn push_usables(out: &mut [f32], offset: &mut usize, origin: Vec2, items: &[NearbyUsable]) {
    let mut sorted: Vec<&NearbyUsable> = items.iter().collect();
    sorted.sort_by(|a, b| a.path_len.total_cmp(&b.path_len));
    for slot in 0..USABLE_SLOTS {
        match sorted.get(slot) {
            Some(u) => {
                let rel = u.position.sub(origin);
                push_scalar(out, offset, rel.x / POS_NORM);
                push_scalar(out, offset, rel.y / POS_NORM);
                push_scalar(out, offset, u.path_len / POS_NORM);
            }
            None => *offset += 3,
        }
    }
}

/// Encode one frame into schema v1 given the previous position, if any.
pub fn encode_frame_v1(frame: &StateFrame, prev_position: Option<Vec2>) -> [f32; F] {
    let mut out = [0.0f32; F];
    let mut off = 0usize;

    push_scalar(&mut out, &mut off, frame.position.x / POS_NORM);
    push_scalar(&mut out, &mut off, frame.position.y / POS_NORM);

    let delta = prev_position
        .map(|p| frame.position.sub(p))
        .unwrap_or(Vec2::ZERO);
    push_scalar(&mut out, &mut off, delta.x / POS_NORM);
    push_scalar(&mut out, &mut off, delta.y / POS_NORM);

    push_scalar(&mut out, &mut off, frame.kill_cooldown / KILL_COOLDOWN_NORM);
    push_scalar(&mut out, &mut off, if frame.is_impostor { 1.0 } else { 0.0 });

    push_scalar(&mut out, &mut off, frame.direction_to_nearest_body.x);
    push_scalar(&mut out, &mut off, frame.direction_to_nearest_body.y);

    push_usables(&mut out, &mut off, frame.position, &frame.nearby_doors);
    push_usables(&mut out, &mut off, frame.position, &frame.nearby_vents);

    debug_assert_eq!(off, F);
    out
}
