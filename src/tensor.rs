//! Synthetic network input.

use rand::Rng;

use crate::errors::{BenchError, BenchResult};

/// Spatial and channel dimensions of a single-image NCHW input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputShape {
    pub channels: usize,
    pub height: usize,
    pub width: usize,
}

impl InputShape {
    pub fn new(channels: usize, height: usize, width: usize) -> BenchResult<Self> {
        if channels == 0 || height == 0 || width == 0 {
            return Err(BenchError::InvalidInputShape {
                channels,
                height,
                width,
            });
        }

        Ok(Self {
            channels,
            height,
            width,
        })
    }

    /// Tensor dimensions with a batch size of one.
    pub fn dims(&self) -> [usize; 4] {
        [1, self.channels, self.height, self.width]
    }

    pub fn element_count(&self) -> usize {
        self.channels * self.height * self.width
    }
}

/// Dense f32 tensor fed to a network.
#[derive(Debug, Clone, PartialEq)]
pub struct InputTensor {
    dims: [usize; 4],
    data: Vec<f32>,
}

impl InputTensor {
    /// Fills a tensor of the given shape with values drawn uniformly from `[0, 1)`.
    pub fn random<R: Rng + ?Sized>(shape: InputShape, rng: &mut R) -> Self {
        let data = (0..shape.element_count())
            .map(|_| rng.r#gen::<f32>())
            .collect();

        Self {
            dims: shape.dims(),
            data,
        }
    }

    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }
}
