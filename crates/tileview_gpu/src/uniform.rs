//! Shared uniform types for the quad pipeline.

use bytemuck::{Pod, Zeroable};

/// Size every per-draw uniform slot is padded to. Matches the minimum
/// `min_uniform_buffer_offset_alignment` wgpu guarantees.
pub const UNIFORM_SLOT_SIZE: u64 = 256;

/// 3x3 affine transform laid out as a WGSL `mat3x3<f32>`.
///
/// WGSL stores each column padded to 16 bytes, so the matrix is uploaded as
/// three `vec4` columns. Input is row-major, as the engine builds it.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct TransformUniform {
    pub columns: [[f32; 4]; 3],
}

impl TransformUniform {
    pub fn identity() -> Self {
        Self::from_row_major(&[1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0])
    }

    /// Build from a row-major 3x3 matrix.
    pub fn from_row_major(m: &[f32; 9]) -> Self {
        Self {
            columns: [
                [m[0], m[3], m[6], 0.0],
                [m[1], m[4], m[7], 0.0],
                [m[2], m[5], m[8], 0.0],
            ],
        }
    }
}

impl Default for TransformUniform {
    fn default() -> Self {
        Self::identity()
    }
}
