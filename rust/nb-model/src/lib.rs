//! nb-model: Sequence model interface + reference LSTM.

pub mod lstm;

use std::sync::Arc;

use thiserror::Error;

use nb_core::Logits;

pub use lstm::LstmModel;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("safetensors: {0}")]
    Safetensors(#[from] safetensors::SafeTensorError),
    #[error("missing tensor: {0}")]
    MissingTensor(String),
    #[error("tensor {name} has dtype {dtype}, expected F32")]
    BadDtype { name: String, dtype: String },
    #[error("tensor {name} has shape {got:?}, expected {expected:?}")]
    BadShape {
        name: String,
        got: Vec<usize>,
        expected: Vec<usize>,
    },
    #[error("model has no recurrent layers")]
    NoLayers,
    #[error("input has dimension {got}, model expects {expected}")]
    InputDim { got: usize, expected: usize },
    #[error("input window is empty")]
    EmptyWindow,
}

/// Read-only sequence model evaluated on one window at a time.
///
/// - `window` is oldest-first, one feature vector per time step.
/// - The result is four gate values ordered `(+x, -x, +y, -y)`.
pub trait SequenceModel {
    fn input_dim(&self) -> usize;
    fn infer(&self, window: &[Vec<f32>]) -> Result<Logits, ModelError>;
}

impl<M: SequenceModel + ?Sized> SequenceModel for &M {
    fn input_dim(&self) -> usize {
        (**self).input_dim()
    }

    fn infer(&self, window: &[Vec<f32>]) -> Result<Logits, ModelError> {
        (**self).infer(window)
    }
}

impl<M: SequenceModel + ?Sized> SequenceModel for Arc<M> {
    fn input_dim(&self) -> usize {
        (**self).input_dim()
    }

    fn infer(&self, window: &[Vec<f32>]) -> Result<Logits, ModelError> {
        (**self).infer(window)
    }
}


#[cfg(test)]
mod lstm_tests;
