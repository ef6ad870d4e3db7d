//! nb-bench: fixtures shared by the criterion benches.

use std::collections::BTreeMap;

use bytemuck::cast_slice;
use safetensors::tensor::{Dtype, TensorView};

use nb_proto::{NearbyUsable, StateFrame, Vec2, MAX_NEARBY};

/// A frame with every optional slot filled.
pub fn busy_frame(tick: u64) -> StateFrame {
    let usable = |i: usize| NearbyUsable {
        position: Vec2::new(i as f32 * 3.0, -(i as f32)),
        path_len: 4.0 + i as f32,
    };
    StateFrame {
        tick,
        position: Vec2::new(12.5, -7.25),
        kill_cooldown: 17.0,
        is_impostor: true,
        is_dead: false,
        direction_to_nearest_body: Vec2::new(0.6, -0.8),
        nearby_doors: (0..MAX_NEARBY).map(usable).collect(),
        nearby_vents: (0..MAX_NEARBY).map(|i| usable(i + 5)).collect(),
    }
}

/// Single-layer LSTM artifact with small deterministic weights.
pub fn lstm_safetensors(input_dim: usize, hidden: usize) -> Vec<u8> {
    let fill = |n: usize, seed: usize| -> Vec<f32> {
        (0..n)
            .map(|i| (((i * 31 + seed * 17) % 97) as f32 / 97.0 - 0.5) * 0.2)
            .collect()
    };
    let tensors: Vec<(&str, Vec<usize>, Vec<f32>)> = vec![
        ("lstm.weight_ih_l0", vec![4 * hidden, input_dim], fill(4 * hidden * input_dim, 1)),
        ("lstm.weight_hh_l0", vec![4 * hidden, hidden], fill(4 * hidden * hidden, 2)),
        ("lstm.bias_ih_l0", vec![4 * hidden], fill(4 * hidden, 3)),
        ("lstm.bias_hh_l0", vec![4 * hidden], fill(4 * hidden, 4)),
        ("fc.weight", vec![4, hidden], fill(4 * hidden, 5)),
        ("fc.bias", vec![4], fill(4, 6)),
    ];
    let mut views = BTreeMap::new();
    for (name, shape, data) in &tensors {
        let view = TensorView::new(Dtype::F32, shape.clone(), cast_slice(data)).unwrap();
        views.insert(name.to_string(), view);
    }
    safetensors::serialize(&views, &None).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use nb_model::{LstmModel, SequenceModel};

    #[test]
    fn fixture_model_loads() {
        let m = LstmModel::from_safetensors(&lstm_safetensors(26, 8)).unwrap();
        assert_eq!(m.input_dim(), 26);
        assert_eq!(m.hidden_dim(), 8);
    }

    #[test]
    fn busy_frame_roundtrips() {
        let f = busy_frame(3);
        let bytes = nb_proto::encode_state_frame(&f);
        assert_eq!(nb_proto::decode_state_frame(&bytes).unwrap(), f);
    }
}
