//! Stacked LSTM + linear head, weights from a safetensors file.
//!
//! Tensor names follow the PyTorch `nn.LSTM` / `nn.Linear` state dict:
//! `lstm.weight_ih_l{k}` `[4H, in]`, `lstm.weight_hh_l{k}` `[4H, H]`,
//! `lstm.bias_ih_l{k}` `[4H]`, `lstm.bias_hh_l{k}` `[4H]`, `fc.weight` `[4, H]`,
//! `fc.bias` `[4]`. Gate order inside the `4H` rows is input, forget, cell, output.
//! The head output goes through a sigmoid.

use std::path::Path;

use safetensors::tensor::{Dtype, TensorView};
use safetensors::SafeTensors;

use nb_core::{Logits, LOGITS_LEN};

use crate::{ModelError, SequenceModel};

#[derive(Debug, Clone)]
struct LstmLayer {
    input_dim: usize,
    /// `[4H, input_dim]`, row-major.
    w_ih: Vec<f32>,
    /// `[4H, H]`, row-major.
    w_hh: Vec<f32>,
    /// `bias_ih + bias_hh`, `[4H]`.
    bias: Vec<f32>,
}

#[derive(Debug, Clone)]
pub struct LstmModel {
    hidden_dim: usize,
    layers: Vec<LstmLayer>,
    /// `[LOGITS_LEN, H]`, row-major.
    fc_w: Vec<f32>,
    fc_b: Vec<f32>,
}

impl LstmModel {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ModelError> {
        let bytes = std::fs::read(path)?;
        Self::from_safetensors(&bytes)
    }

    pub fn from_safetensors(bytes: &[u8]) -> Result<Self, ModelError> {
        let st = SafeTensors::deserialize(bytes)?;

        let hh_shape = tensor(&st, "lstm.weight_hh_l0")?.shape().to_vec();
        let hidden_dim = match hh_shape.as_slice() {
            [rows, h] if *h > 0 && *rows == 4 * *h => *h,
            _ => {
                let h = hh_shape.last().copied().unwrap_or(0);
                return Err(ModelError::BadShape {
                    name: "lstm.weight_hh_l0".to_string(),
                    got: hh_shape,
                    expected: vec![4 * h, h],
                });
            }
        };
        let h4 = 4 * hidden_dim;

        let mut layers = Vec::new();
        let mut in_dim = None;
        while st.tensor(&format!("lstm.weight_ih_l{}", layers.len())).is_ok() {
            let k = layers.len();
            let w_ih_name = format!("lstm.weight_ih_l{k}");
            let w_ih_view = tensor(&st, &w_ih_name)?;
            let input_dim = match (in_dim, w_ih_view.shape()) {
                (None, [rows, d]) if *rows == h4 && *d > 0 => *d,
                (Some(d), _) => d,
                (None, got) => {
                    return Err(ModelError::BadShape {
                        name: w_ih_name,
                        got: got.to_vec(),
                        expected: vec![h4, 0],
                    })
                }
            };
            let w_ih = read_f32(&st, &w_ih_name, &[h4, input_dim])?;
            let w_hh = read_f32(&st, &format!("lstm.weight_hh_l{k}"), &[h4, hidden_dim])?;
            let b_ih = read_f32(&st, &format!("lstm.bias_ih_l{k}"), &[h4])?;
            let b_hh = read_f32(&st, &format!("lstm.bias_hh_l{k}"), &[h4])?;
            let bias = b_ih.iter().zip(&b_hh).map(|(a, b)| a + b).collect();

            layers.push(LstmLayer {
                input_dim,
                w_ih,
                w_hh,
                bias,
            });
            // Upper layers consume the hidden state of the layer below.
            in_dim = Some(hidden_dim);
        }
        if layers.is_empty() {
            return Err(ModelError::NoLayers);
        }

        let fc_w = read_f32(&st, "fc.weight", &[LOGITS_LEN, hidden_dim])?;
        let fc_b = read_f32(&st, "fc.bias", &[LOGITS_LEN])?;

        Ok(Self {
            hidden_dim,
            layers,
            fc_w,
            fc_b,
        })
    }

    pub fn hidden_dim(&self) -> usize {
        self.hidden_dim
    }

    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }
}

impl SequenceModel for LstmModel {
    fn input_dim(&self) -> usize {
        self.layers[0].input_dim
    }

    fn infer(&self, window: &[Vec<f32>]) -> Result<Logits, ModelError> {
        if window.is_empty() {
            return Err(ModelError::EmptyWindow);
        }
        let expected = self.input_dim();
        if let Some(bad) = window.iter().find(|v| v.len() != expected) {
            return Err(ModelError::InputDim {
                got: bad.len(),
                expected,
            });
        }

        let h = self.hidden_dim;
        let mut seq: Vec<Vec<f32>> = window.to_vec();
        let mut gates = vec![0.0f32; 4 * h];
        for layer in &self.layers {
            let mut hs = vec![0.0f32; h];
            let mut cs = vec![0.0f32; h];
            let mut outputs = Vec::with_capacity(seq.len());
            for x in &seq {
                gates.copy_from_slice(&layer.bias);
                matvec_acc(&layer.w_ih, layer.input_dim, x, &mut gates);
                matvec_acc(&layer.w_hh, h, &hs, &mut gates);
                for j in 0..h {
                    let i = sigmoid(gates[j]);
                    let f = sigmoid(gates[h + j]);
                    let g = gates[2 * h + j].tanh();
                    let o = sigmoid(gates[3 * h + j]);
                    cs[j] = f * cs[j] + i * g;
                    hs[j] = o * cs[j].tanh();
                }
                outputs.push(hs.clone());
            }
            seq = outputs;
        }

        let last = seq.last().ok_or(ModelError::EmptyWindow)?;
        let mut out: Logits = [0.0; LOGITS_LEN];
        out.copy_from_slice(&self.fc_b);
        matvec_acc(&self.fc_w, h, last, &mut out);
        for v in out.iter_mut() {
            *v = sigmoid(*v);
        }
        Ok(out)
    }
}

#[inline]
fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// `out += W x` for row-major `W` with `cols` columns.
fn matvec_acc(w: &[f32], cols: usize, x: &[f32], out: &mut [f32]) {
    debug_assert_eq!(w.len(), out.len() * cols);
    for (row, o) in w.chunks_exact(cols).zip(out.iter_mut()) {
        *o += row.iter().zip(x).map(|(a, b)| a * b).sum::<f32>();
    }
}

fn tensor<'data>(st: &SafeTensors<'data>, name: &str) -> Result<TensorView<'data>, ModelError> {
    st.tensor(name)
        .map_err(|_| ModelError::MissingTensor(name.to_string()))
}

fn read_f32(st: &SafeTensors<'_>, name: &str, shape: &[usize]) -> Result<Vec<f32>, ModelError> {
    let view = tensor(st, name)?;
    if view.dtype() != Dtype::F32 {
        return Err(ModelError::BadDtype {
            name: name.to_string(),
            dtype: format!("{:?}", view.dtype()),
        });
    }
    if view.shape() != shape {
        return Err(ModelError::BadShape {
            name: name.to_string(),
            got: view.shape().to_vec(),
            expected: shape.to_vec(),
        });
    }
    // Tensor data is not guaranteed to be 4-byte aligned.
    Ok(bytemuck::pod_collect_to_vec::<u8, f32>(view.data()))
}
