//! Pan/zoom mathematics.
//!
//! Screen coordinates are canvas pixels with the origin at the top-left
//! corner. Image coordinates are source pixels with the origin at the
//! image's top-left corner. The view places the image centre at
//! `canvas_centre + translate`, scaled by `scale`:
//!
//! ```text
//! screen = canvas_centre + translate + (image - image_centre) * scale
//! ```

use crate::constants::SCALE_EPSILON;
use crate::matrix::Mat3;

/// Canvas and image geometry the transform is evaluated against.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Viewport {
    pub canvas_width: f64,
    pub canvas_height: f64,
    pub image_width: f64,
    pub image_height: f64,
}

impl Viewport {
    pub fn new(canvas_width: f64, canvas_height: f64, image_width: f64, image_height: f64) -> Self {
        Self {
            canvas_width,
            canvas_height,
            image_width,
            image_height,
        }
    }

    /// Both canvas and image have a positive area.
    pub fn is_valid(&self) -> bool {
        self.canvas_width > 0.0
            && self.canvas_height > 0.0
            && self.image_width > 0.0
            && self.image_height > 0.0
    }

    /// Scale at which the whole image fits the canvas, aspect preserved.
    /// Degenerate geometry yields `1.0`.
    pub fn fit_scale(&self) -> f64 {
        if !self.is_valid() {
            return 1.0;
        }
        (self.canvas_width / self.image_width).min(self.canvas_height / self.image_height)
    }

    pub fn canvas_center(&self) -> (f64, f64) {
        (self.canvas_width / 2.0, self.canvas_height / 2.0)
    }
}

/// Axis-aligned rectangle in image pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageRect {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl ImageRect {
    pub fn intersects(&self, other: &ImageRect) -> bool {
        self.left < other.right
            && other.left < self.right
            && self.top < other.bottom
            && other.top < self.bottom
    }
}

/// Represents pan/zoom transform state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewTransform {
    pub scale: f64,
    pub translate_x: f64,
    pub translate_y: f64,
}

impl ViewTransform {
    pub fn new(scale: f64, translate_x: f64, translate_y: f64) -> Self {
        Self {
            scale,
            translate_x,
            translate_y,
        }
    }

    /// Fit-to-screen scale, centred.
    pub fn fitted(viewport: &Viewport) -> Self {
        Self::new(viewport.fit_scale(), 0.0, 0.0)
    }

    /// Current scale divided by the fit-to-screen scale.
    pub fn relative_scale(&self, viewport: &Viewport) -> f64 {
        self.scale / viewport.fit_scale()
    }

    /// Matrix taking image pixels to screen pixels.
    pub fn image_to_screen_matrix(&self, viewport: &Viewport) -> Mat3 {
        let (cx, cy) = viewport.canvas_center();
        let s = self.scale;
        Mat3::scale_translate(
            s,
            s,
            cx + self.translate_x - viewport.image_width / 2.0 * s,
            cy + self.translate_y - viewport.image_height / 2.0 * s,
        )
    }

    pub fn image_to_screen(&self, viewport: &Viewport, x: f64, y: f64) -> (f64, f64) {
        self.image_to_screen_matrix(viewport).transform_point(x, y)
    }

    pub fn screen_to_image(&self, viewport: &Viewport, x: f64, y: f64) -> (f64, f64) {
        let (cx, cy) = viewport.canvas_center();
        (
            (x - cx - self.translate_x) / self.scale + viewport.image_width / 2.0,
            (y - cy - self.translate_y) / self.scale + viewport.image_height / 2.0,
        )
    }

    /// Part of the image on screen: the canvas rectangle taken through the
    /// inverse view matrix and clamped to the image. `None` when nothing of
    /// the image is visible.
    pub fn visible_image_rect(&self, viewport: &Viewport) -> Option<ImageRect> {
        if !viewport.is_valid() || self.scale <= 0.0 {
            return None;
        }
        let inverse = self.image_to_screen_matrix(viewport).inverse()?;
        let (ax, ay) = inverse.transform_point(0.0, 0.0);
        let (bx, by) = inverse.transform_point(viewport.canvas_width, viewport.canvas_height);

        let rect = ImageRect {
            left: ax.min(bx).max(0.0),
            top: ay.min(by).max(0.0),
            right: ax.max(bx).min(viewport.image_width),
            bottom: ay.max(by).min(viewport.image_height),
        };
        (rect.left < rect.right && rect.top < rect.bottom).then_some(rect)
    }

    /// Zoom to `new_scale` keeping the image point under `(anchor_x, anchor_y)`
    /// fixed on screen.
    ///
    /// The image-space point under the anchor is found at the current scale,
    /// then translate is solved so the same point lands on the anchor at the
    /// new scale. No clamping happens here.
    pub fn zoom_at(
        &self,
        viewport: &Viewport,
        new_scale: f64,
        anchor_x: f64,
        anchor_y: f64,
    ) -> ViewTransform {
        let (cx, cy) = viewport.canvas_center();

        // Anchor relative to the current image centre on screen
        let rel_x = anchor_x - cx - self.translate_x;
        let rel_y = anchor_y - cy - self.translate_y;

        let ratio = new_scale / self.scale;

        ViewTransform {
            scale: new_scale,
            translate_x: anchor_x - cx - rel_x * ratio,
            translate_y: anchor_y - cy - rel_y * ratio,
        }
    }

    /// Apply a pan delta to the transform.
    pub fn pan_by(&self, dx: f64, dy: f64) -> ViewTransform {
        ViewTransform {
            scale: self.scale,
            translate_x: self.translate_x + dx,
            translate_y: self.translate_y + dy,
        }
    }

    /// Apply the bounds constraint.
    ///
    /// At or below fit-to-screen the image is centred. Above it, each
    /// translate axis is limited to half of that axis' overflow.
    pub fn constrained(&self, viewport: &Viewport) -> ViewTransform {
        if !viewport.is_valid() {
            return *self;
        }
        if self.scale <= viewport.fit_scale() * (1.0 + SCALE_EPSILON) {
            return ViewTransform::new(self.scale, 0.0, 0.0);
        }

        let max_x = ((viewport.image_width * self.scale - viewport.canvas_width) / 2.0).max(0.0);
        let max_y = ((viewport.image_height * self.scale - viewport.canvas_height) / 2.0).max(0.0);

        ViewTransform {
            scale: self.scale,
            translate_x: self.translate_x.clamp(-max_x, max_x),
            translate_y: self.translate_y.clamp(-max_y, max_y),
        }
    }

    /// Linear interpolation towards `target`, `t` in `[0, 1]`.
    pub fn lerp(&self, target: &ViewTransform, t: f64) -> ViewTransform {
        ViewTransform {
            scale: self.scale + (target.scale - self.scale) * t,
            translate_x: self.translate_x + (target.translate_x - self.translate_x) * t,
            translate_y: self.translate_y + (target.translate_y - self.translate_y) * t,
        }
    }
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self::new(1.0, 0.0, 0.0)
    }
}

/// Clamp an absolute scale to `[min_multiplier, max_multiplier] * fit`.
pub fn clamp_scale(viewport: &Viewport, scale: f64, min_multiplier: f64, max_multiplier: f64) -> f64 {
    let fit = viewport.fit_scale();
    scale.clamp(min_multiplier * fit, max_multiplier * fit)
}

/// True when two scales are equal up to [`SCALE_EPSILON`] relative error.
pub fn scales_equal(a: f64, b: f64) -> bool {
    (a - b).abs() <= SCALE_EPSILON * a.abs().max(b.abs()).max(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-6;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < EPSILON
    }

    fn viewport() -> Viewport {
        Viewport::new(800.0, 600.0, 4000.0, 3000.0)
    }

    #[test]
    fn test_fit_scale_uses_limiting_axis() {
        assert!(approx_eq(viewport().fit_scale(), 0.2));
        let tall = Viewport::new(800.0, 600.0, 1000.0, 3000.0);
        assert!(approx_eq(tall.fit_scale(), 0.2));
        let wide = Viewport::new(800.0, 600.0, 4000.0, 1000.0);
        assert!(approx_eq(wide.fit_scale(), 0.2));
    }

    #[test]
    fn test_fit_scale_degenerate_geometry() {
        assert_eq!(Viewport::new(0.0, 600.0, 100.0, 100.0).fit_scale(), 1.0);
        assert_eq!(Viewport::default().fit_scale(), 1.0);
    }

    #[test]
    fn test_screen_image_round_trip() {
        let vp = viewport();
        let t = ViewTransform::new(0.7, 35.0, -12.0);
        let (ix, iy) = t.screen_to_image(&vp, 123.0, 456.0);
        let (sx, sy) = t.image_to_screen(&vp, ix, iy);
        assert!(approx_eq(sx, 123.0));
        assert!(approx_eq(sy, 456.0));
    }

    #[test]
    fn test_canvas_centre_maps_to_image_centre_when_untranslated() {
        let vp = viewport();
        let t = ViewTransform::fitted(&vp);
        let (ix, iy) = t.screen_to_image(&vp, 400.0, 300.0);
        assert!(approx_eq(ix, 2000.0));
        assert!(approx_eq(iy, 1500.0));
    }

    #[test]
    fn test_zoom_at_center_keeps_translate() {
        let vp = viewport();
        let t = ViewTransform::fitted(&vp).zoom_at(&vp, 0.4, 400.0, 300.0);
        assert!(approx_eq(t.scale, 0.4));
        assert!(approx_eq(t.translate_x, 0.0));
        assert!(approx_eq(t.translate_y, 0.0));
    }

    #[test]
    fn test_zoom_at_preserves_anchor_point() {
        let vp = viewport();
        let cases = [
            (ViewTransform::new(0.2, 0.0, 0.0), 10.0, 20.0, 3.0),
            (ViewTransform::new(1.0, 150.0, -80.0), 700.0, 550.0, 0.5),
            (ViewTransform::new(0.35, -40.0, 10.0), 0.0, 600.0, 1.7),
        ];
        for (t, ax, ay, factor) in cases {
            let before = t.screen_to_image(&vp, ax, ay);
            let zoomed = t.zoom_at(&vp, t.scale * factor, ax, ay);
            let after = zoomed.screen_to_image(&vp, ax, ay);
            assert!(approx_eq(before.0, after.0), "{:?} vs {:?}", before, after);
            assert!(approx_eq(before.1, after.1), "{:?} vs {:?}", before, after);
        }
    }

    #[test]
    fn test_visible_image_rect() {
        let vp = viewport();
        let full = ViewTransform::fitted(&vp).visible_image_rect(&vp).unwrap();
        assert!(approx_eq(full.left, 0.0) && approx_eq(full.right, 4000.0));
        assert!(approx_eq(full.top, 0.0) && approx_eq(full.bottom, 3000.0));

        let zoomed = ViewTransform::new(0.8, 0.0, 0.0).visible_image_rect(&vp).unwrap();
        assert!(approx_eq(zoomed.left, 1500.0) && approx_eq(zoomed.right, 2500.0));
        assert!(approx_eq(zoomed.top, 1125.0) && approx_eq(zoomed.bottom, 1875.0));

        assert!(ViewTransform::new(1.0, 1.0e6, 0.0).visible_image_rect(&vp).is_none());
    }

    #[test]
    fn test_pan_by() {
        let t = ViewTransform::new(2.0, 1.0, 1.0).pan_by(4.0, -3.0);
        assert_eq!(t, ViewTransform::new(2.0, 5.0, -2.0));
    }

    #[test]
    fn test_constrained_centres_at_or_below_fit() {
        let vp = viewport();
        let t = ViewTransform::new(0.2, 50.0, -50.0).constrained(&vp);
        assert_eq!(t.translate_x, 0.0);
        assert_eq!(t.translate_y, 0.0);
        let t = ViewTransform::new(0.1, 50.0, -50.0).constrained(&vp);
        assert_eq!((t.translate_x, t.translate_y), (0.0, 0.0));
    }

    #[test]
    fn test_constrained_limits_to_half_overflow() {
        let vp = viewport();
        // 4000 * 0.4 = 1600 wide: overflow 800, limit 400. 3000 * 0.4 = 1200: limit 300.
        let t = ViewTransform::new(0.4, 1000.0, -1000.0).constrained(&vp);
        assert!(approx_eq(t.translate_x, 400.0));
        assert!(approx_eq(t.translate_y, -300.0));

        let inside = ViewTransform::new(0.4, 120.0, 50.0).constrained(&vp);
        assert_eq!(inside, ViewTransform::new(0.4, 120.0, 50.0));
    }

    #[test]
    fn test_constrained_axis_without_overflow_is_centred() {
        // Tall image: above fit vertically but horizontally still narrower than the canvas.
        let vp = Viewport::new(800.0, 600.0, 1000.0, 3000.0);
        let t = ViewTransform::new(0.3, 200.0, 200.0).constrained(&vp);
        assert_eq!(t.translate_x, 0.0);
        assert!(approx_eq(t.translate_y, 150.0));
    }

    #[test]
    fn test_clamp_scale() {
        let vp = viewport();
        assert!(approx_eq(clamp_scale(&vp, 100.0, 0.1, 10.0), 2.0));
        assert!(approx_eq(clamp_scale(&vp, 0.0001, 0.1, 10.0), 0.02));
        assert!(approx_eq(clamp_scale(&vp, 0.5, 0.1, 10.0), 0.5));
    }

    #[test]
    fn test_lerp_endpoints() {
        let a = ViewTransform::new(1.0, 0.0, 10.0);
        let b = ViewTransform::new(3.0, 20.0, -10.0);
        assert_eq!(a.lerp(&b, 0.0), a);
        let mid = a.lerp(&b, 0.5);
        assert!(approx_eq(mid.scale, 2.0));
        assert!(approx_eq(mid.translate_x, 10.0));
        assert!(approx_eq(mid.translate_y, 0.0));
    }

    #[test]
    fn test_scales_equal() {
        assert!(scales_equal(0.2, 0.2 + 1e-12));
        assert!(!scales_equal(0.2, 0.21));
    }
}
