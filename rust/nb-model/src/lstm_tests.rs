use std::collections::BTreeMap;
use std::fs;

use bytemuck::cast_slice;
use safetensors::tensor::{Dtype, TensorView};

use crate::{LstmModel, ModelError, SequenceModel};

struct Fixture {
    tensors: BTreeMap<String, (Vec<usize>, Vec<f32>)>,
}

impl Fixture {
    /// Single-layer model with every weight zero.
    fn zeros(input_dim: usize, hidden: usize) -> Self {
        let mut f = Self {
            tensors: BTreeMap::new(),
        };
        f.set("lstm.weight_ih_l0", vec![4 * hidden, input_dim], 0.0);
        f.set("lstm.weight_hh_l0", vec![4 * hidden, hidden], 0.0);
        f.set("lstm.bias_ih_l0", vec![4 * hidden], 0.0);
        f.set("lstm.bias_hh_l0", vec![4 * hidden], 0.0);
        f.set("fc.weight", vec![4, hidden], 0.0);
        f.set("fc.bias", vec![4], 0.0);
        f
    }

    fn set(&mut self, name: &str, shape: Vec<usize>, fill: f32) {
        let n = shape.iter().product();
        self.tensors.insert(name.to_string(), (shape, vec![fill; n]));
    }

    fn data(&mut self, name: &str) -> &mut Vec<f32> {
        &mut self.tensors.get_mut(name).unwrap().1
    }

    fn bytes(&self) -> Vec<u8> {
        let mut views: BTreeMap<String, TensorView<'_>> = BTreeMap::new();
        for (name, (shape, data)) in &self.tensors {
            views.insert(
                name.clone(),
                TensorView::new(Dtype::F32, shape.clone(), cast_slice(data)).unwrap(),
            );
        }
        safetensors::serialize(&views, &None).unwrap()
    }

    fn model(&self) -> Result<LstmModel, ModelError> {
        LstmModel::from_safetensors(&self.bytes())
    }
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

#[test]
fn bias_only_head_is_window_independent() {
    let mut f = Fixture::zeros(3, 2);
    f.data("fc.bias").copy_from_slice(&[10.0, -10.0, 0.0, 10.0]);
    let m = f.model().unwrap();
    assert_eq!(m.input_dim(), 3);
    assert_eq!(m.hidden_dim(), 2);
    assert_eq!(m.num_layers(), 1);

    let out = m.infer(&vec![vec![0.3, -1.0, 2.0]; 10]).unwrap();
    assert!(out[0] > 0.99);
    assert!(out[1] < 0.01);
    assert!((out[2] - 0.5).abs() < 1e-6);
    assert!(out[3] > 0.99);
    assert_eq!(
        nb_core::decode_action(&out),
        nb_core::ActionCommand::new(1, -1)
    );
}

#[test]
fn single_step_matches_hand_computation() {
    let mut f = Fixture::zeros(1, 1);
    f.data("lstm.weight_ih_l0").copy_from_slice(&[1.0, 1.0, 1.0, 1.0]);
    f.data("fc.weight").copy_from_slice(&[1.0, -1.0, 0.0, 2.0]);
    let m = f.model().unwrap();

    let out = m.infer(&[vec![1.0]]).unwrap();

    let i = sigmoid(1.0);
    let g = 1.0f32.tanh();
    let o = sigmoid(1.0);
    let c = i * g;
    let h = o * c.tanh();
    let expected = [sigmoid(h), sigmoid(-h), 0.5, sigmoid(2.0 * h)];
    for (a, b) in out.iter().zip(expected) {
        assert!((a - b).abs() < 1e-6, "got {out:?}, expected {expected:?}");
    }
}

#[test]
fn leading_zero_steps_do_not_move_state_without_bias() {
    let mut f = Fixture::zeros(1, 1);
    f.data("lstm.weight_ih_l0").copy_from_slice(&[1.0, 1.0, 1.0, 1.0]);
    f.data("lstm.weight_hh_l0").copy_from_slice(&[0.5, 0.5, 0.5, 0.5]);
    f.data("fc.weight").copy_from_slice(&[3.0, 0.0, 0.0, 0.0]);
    let m = f.model().unwrap();

    let short = m.infer(&[vec![1.0]]).unwrap();
    let mut padded = vec![vec![0.0]; 9];
    padded.push(vec![1.0]);
    let long = m.infer(&padded).unwrap();
    assert!((short[0] - long[0]).abs() < 1e-6);
}

#[test]
fn stacked_layers_are_discovered() {
    let mut f = Fixture::zeros(5, 3);
    f.set("lstm.weight_ih_l1", vec![12, 3], 0.1);
    f.set("lstm.weight_hh_l1", vec![12, 3], 0.1);
    f.set("lstm.bias_ih_l1", vec![12], 0.0);
    f.set("lstm.bias_hh_l1", vec![12], 0.0);
    let m = f.model().unwrap();
    assert_eq!(m.num_layers(), 2);
    assert_eq!(m.input_dim(), 5);
    let out = m.infer(&vec![vec![1.0; 5]; 4]).unwrap();
    assert!(out.iter().all(|v| v.is_finite()));
}

#[test]
fn missing_head_fails_to_load() {
    let mut f = Fixture::zeros(2, 2);
    f.tensors.remove("fc.bias");
    match f.model() {
        Err(ModelError::MissingTensor(name)) => assert_eq!(name, "fc.bias"),
        other => panic!("expected MissingTensor, got {other:?}"),
    }
}

#[test]
fn wrong_head_shape_fails_to_load() {
    let mut f = Fixture::zeros(2, 2);
    f.set("fc.weight", vec![3, 2], 0.0);
    assert!(matches!(f.model(), Err(ModelError::BadShape { .. })));
}

#[test]
fn no_recurrent_weights_fails_to_load() {
    let mut f = Fixture::zeros(2, 2);
    f.tensors.remove("lstm.weight_ih_l0");
    assert!(matches!(f.model(), Err(ModelError::NoLayers)));
}

#[test]
fn window_dimension_is_checked_per_call() {
    let m = Fixture::zeros(4, 2).model().unwrap();
    assert!(matches!(
        m.infer(&[vec![0.0; 3]]),
        Err(ModelError::InputDim {
            got: 3,
            expected: 4
        })
    ));
    assert!(matches!(m.infer(&[]), Err(ModelError::EmptyWindow)));
}

#[test]
fn load_from_file_and_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.safetensors");
    fs::write(&path, Fixture::zeros(2, 2).bytes()).unwrap();
    assert_eq!(LstmModel::load(&path).unwrap().input_dim(), 2);

    assert!(matches!(
        LstmModel::load(dir.path().join("absent.safetensors")),
        Err(ModelError::Io(_))
    ));

    let garbage = dir.path().join("garbage.safetensors");
    fs::write(&garbage, b"not a safetensors file").unwrap();
    assert!(LstmModel::load(&garbage).is_err());
}

#[test]
fn shared_handles_delegate() {
    let m = std::sync::Arc::new(Fixture::zeros(2, 2).model().unwrap());
    let by_ref: &LstmModel = &m;
    assert_eq!(SequenceModel::input_dim(&m), 2);
    assert_eq!(SequenceModel::input_dim(&by_ref), 2);
}
