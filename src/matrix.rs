//! Row-major 3x3 affine matrices for 2D placement.

use std::ops::Mul;

/// Row-major 3x3 matrix: `[a, b, c, d, e, f, g, h, i]` is
///
/// ```text
/// | a b c |
/// | d e f |
/// | g h i |
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mat3(pub [f64; 9]);

impl Mat3 {
    pub const IDENTITY: Mat3 = Mat3([1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0]);

    /// Scale then translate.
    pub fn scale_translate(sx: f64, sy: f64, tx: f64, ty: f64) -> Self {
        Mat3([sx, 0.0, tx, 0.0, sy, ty, 0.0, 0.0, 1.0])
    }

    pub fn transform_point(&self, x: f64, y: f64) -> (f64, f64) {
        let m = &self.0;
        (m[0] * x + m[1] * y + m[2], m[3] * x + m[4] * y + m[5])
    }

    /// Inverse of an affine matrix, `None` when singular.
    pub fn inverse(&self) -> Option<Mat3> {
        let m = &self.0;
        let det = m[0] * m[4] - m[1] * m[3];
        if det.abs() < f64::EPSILON {
            return None;
        }
        let inv_det = 1.0 / det;
        let a = m[4] * inv_det;
        let b = -m[1] * inv_det;
        let d = -m[3] * inv_det;
        let e = m[0] * inv_det;
        Some(Mat3([
            a,
            b,
            -(a * m[2] + b * m[5]),
            d,
            e,
            -(d * m[2] + e * m[5]),
            0.0,
            0.0,
            1.0,
        ]))
    }

    pub fn to_f32(&self) -> [f32; 9] {
        self.0.map(|v| v as f32)
    }
}

impl Default for Mat3 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mul for Mat3 {
    type Output = Mat3;

    fn mul(self, rhs: Mat3) -> Mat3 {
        let a = &self.0;
        let b = &rhs.0;
        let mut out = [0.0; 9];
        for row in 0..3 {
            for col in 0..3 {
                out[row * 3 + col] = (0..3).map(|k| a[row * 3 + k] * b[k * 3 + col]).sum();
            }
        }
        Mat3(out)
    }
}
