//! Fixed-length temporal window over feature vectors.
//!
//! The window holds at most `len` real vectors, oldest first. [`FeatureWindow::materialize`]
//! always yields exactly `len` vectors: missing history is filled with zero
//! vectors in front of the oldest real one. Padding is never stored.

use std::collections::VecDeque;

use thiserror::Error;

use crate::extract::FeatureVector;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WindowError {
    #[error("feature vector has dimension {got}, window expects {expected}")]
    DimMismatch { got: usize, expected: usize },
    #[error("window length must be >= 1")]
    ZeroLen,
    #[error("feature dimension must be >= 1")]
    ZeroDim,
}

#[derive(Debug, Clone)]
pub struct FeatureWindow {
    buf: VecDeque<FeatureVector>,
    len: usize,
    dim: usize,
}

impl FeatureWindow {
    /// `dim` is fixed here so padding is well defined before the first push.
    pub fn new(len: usize, dim: usize) -> Result<Self, WindowError> {
        if len == 0 {
            return Err(WindowError::ZeroLen);
        }
        if dim == 0 {
            return Err(WindowError::ZeroDim);
        }
        Ok(Self {
            buf: VecDeque::with_capacity(len + 1),
            len,
            dim,
        })
    }

    /// Append `v`, evicting the oldest vector once more than `len` are held.
    pub fn push(&mut self, v: FeatureVector) -> Result<(), WindowError> {
        if v.len() != self.dim {
            return Err(WindowError::DimMismatch {
                got: v.len(),
                expected: self.dim,
            });
        }
        self.buf.push_back(v);
        if self.buf.len() > self.len {
            self.buf.pop_front();
        }
        Ok(())
    }

    /// Exactly `len` vectors: `len - observed()` zero vectors, then the real
    /// vectors oldest first.
    pub fn materialize(&self) -> Vec<FeatureVector> {
        let pad = self.padding();
        let mut out = Vec::with_capacity(self.len);
        out.extend(std::iter::repeat_with(|| vec![0.0f32; self.dim]).take(pad));
        out.extend(self.buf.iter().cloned());
        out
    }

    /// Row-major `[len, dim]` copy of [`FeatureWindow::materialize`] written into `out`.
    pub fn materialize_into(&self, out: &mut Vec<f32>) {
        out.clear();
        out.reserve(self.len * self.dim);
        out.resize(self.padding() * self.dim, 0.0);
        for v in &self.buf {
            out.extend_from_slice(v);
        }
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }

    /// Number of real vectors currently held.
    pub fn observed(&self) -> usize {
        self.buf.len()
    }

    pub fn padding(&self) -> usize {
        self.len - self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Number of vectors [`FeatureWindow::materialize`] returns.
    pub fn window_len(&self) -> usize {
        self.len
    }

    pub fn dim(&self) -> usize {
        self.dim
    }
}
