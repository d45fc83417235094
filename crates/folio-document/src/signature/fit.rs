// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Signature image fitting.
//
// A signature image is drawn inside a form XObject whose BBox is the image's
// pixel size. The viewer then maps that BBox onto the widget rectangle, which
// stretches it non-uniformly whenever the two aspect ratios differ. The matrix
// computed here pre-compensates for that stretch on the longer axis so the
// final image keeps its aspect ratio, touches the widget on one axis, and is
// centred on the other.

use folio_core::error::{FolioError, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// A 2x3 affine matrix with PDF `cm` semantics:
/// `x' = a*x + c*y + e`, `y' = b*x + d*y + f`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Matrix2D {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl Matrix2D {
    pub const IDENTITY: Self = Self::new(1.0, 0.0, 0.0, 1.0, 0.0, 0.0);

    pub const fn new(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Self {
        Self { a, b, c, d, e, f }
    }

    pub const fn scale(sx: f64, sy: f64) -> Self {
        Self::new(sx, 0.0, 0.0, sy, 0.0, 0.0)
    }

    pub const fn translate(tx: f64, ty: f64) -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, tx, ty)
    }

    /// The matrix that applies `self` first and `next` afterwards.
    pub fn then(&self, next: &Matrix2D) -> Matrix2D {
        Matrix2D {
            a: self.a * next.a + self.b * next.c,
            b: self.a * next.b + self.b * next.d,
            c: self.c * next.a + self.d * next.c,
            d: self.c * next.b + self.d * next.d,
            e: self.e * next.a + self.f * next.c + next.e,
            f: self.e * next.b + self.f * next.d + next.f,
        }
    }

    pub fn transform_point(&self, x: f64, y: f64) -> (f64, f64) {
        (
            self.a * x + self.c * y + self.e,
            self.b * x + self.d * y + self.f,
        )
    }

    /// The six operands of a `cm` operator, in order.
    pub fn to_array(&self) -> [f64; 6] {
        [self.a, self.b, self.c, self.d, self.e, self.f]
    }
}

impl Default for Matrix2D {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// An axis-aligned rectangle in PDF user space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub llx: f64,
    pub lly: f64,
    pub urx: f64,
    pub ury: f64,
}

impl Rect {
    /// Build a rectangle from any two opposite corners.
    pub fn from_corners(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self {
            llx: x1.min(x2),
            lly: y1.min(y2),
            urx: x1.max(x2),
            ury: y1.max(y2),
        }
    }

    pub fn width(&self) -> f64 {
        self.urx - self.llx
    }

    pub fn height(&self) -> f64 {
        self.ury - self.lly
    }
}

/// Result of fitting a source image of `source_width` x `source_height`
/// pixels into a `target_width` x `target_height` widget.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AffineFit {
    pub target_width: f64,
    pub target_height: f64,
    pub source_width: f64,
    pub source_height: f64,
    pub form_ratio: f64,
    pub image_ratio: f64,
    /// Uniform scale from image pixels to widget units (the binding axis).
    pub scale: f64,
    pub width_adjust: f64,
    pub height_adjust: f64,
    /// Centring offset in widget units.
    pub horz_translate: f64,
    pub vert_translate: f64,
}

/// Fit a source image into a target rectangle, centred and without distortion.
///
/// Fails with [`FolioError::DegenerateInput`] when any dimension is not a
/// strictly positive finite number.
#[instrument(level = "debug")]
pub fn compute_fit(
    target_width: f64,
    target_height: f64,
    source_width: f64,
    source_height: f64,
) -> Result<AffineFit> {
    for (label, value) in [
        ("target width", target_width),
        ("target height", target_height),
        ("source width", source_width),
        ("source height", source_height),
    ] {
        if !value.is_finite() || value <= 0.0 {
            return Err(FolioError::DegenerateInput(format!(
                "{label} must be positive, got {value}"
            )));
        }
    }

    let form_ratio = target_width / target_height;
    let image_ratio = source_width / source_height;

    let mut width_adjust = 1.0;
    let mut height_adjust = 1.0;
    if image_ratio < form_ratio {
        width_adjust = image_ratio / form_ratio;
    } else if image_ratio > form_ratio {
        height_adjust = form_ratio / image_ratio;
    }

    let scale = (target_width / source_width).min(target_height / source_height);
    let horz_translate = (target_width - source_width * scale) / 2.0;
    let vert_translate = (target_height - source_height * scale) / 2.0;

    debug!(width_adjust, height_adjust, scale, "signature image fitted");

    Ok(AffineFit {
        target_width,
        target_height,
        source_width,
        source_height,
        form_ratio,
        image_ratio,
        scale,
        width_adjust,
        height_adjust,
        horz_translate,
        vert_translate,
    })
}

impl AffineFit {
    /// Image matrix inside a form XObject whose BBox is the source pixel size.
    ///
    /// Maps the unit square of image space; translation is expressed before
    /// the viewer's BBox-to-widget scaling.
    pub fn matrix(&self) -> Matrix2D {
        Matrix2D::new(
            self.source_width * self.width_adjust,
            0.0,
            0.0,
            self.source_height * self.height_adjust,
            self.horz_translate * self.width_adjust / self.scale,
            self.vert_translate * self.height_adjust / self.scale,
        )
    }

    /// The BBox-to-widget mapping a viewer applies to the appearance form.
    pub fn widget_matrix(&self) -> Matrix2D {
        Matrix2D::scale(
            self.target_width / self.source_width,
            self.target_height / self.source_height,
        )
    }

    /// Where the image lands in widget space, origin at the widget's
    /// lower-left corner.
    pub fn placement(&self) -> Rect {
        let full = self.matrix().then(&self.widget_matrix());
        let (x0, y0) = full.transform_point(0.0, 0.0);
        let (x1, y1) = full.transform_point(1.0, 1.0);
        Rect::from_corners(x0, y0, x1, y1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < EPS * a.abs().max(b.abs()).max(1.0)
    }

    const CASES: &[(f64, f64, f64, f64)] = &[
        (300.0, 100.0, 640.0, 480.0),
        (100.0, 300.0, 640.0, 480.0),
        (150.0, 50.0, 30.0, 10.0),
        (72.5, 18.25, 1.0, 999.0),
        (1.0, 1.0, 4096.0, 3.0),
        (200.0, 100.0, 400.0, 200.0),
    ];

    #[test]
    fn adjust_factors_are_bounded_and_one_is_unity() {
        for &(tw, th, sw, sh) in CASES {
            let fit = compute_fit(tw, th, sw, sh).unwrap();
            assert!(fit.width_adjust > 0.0 && fit.width_adjust <= 1.0);
            assert!(fit.height_adjust > 0.0 && fit.height_adjust <= 1.0);
            assert!(fit.width_adjust == 1.0 || fit.height_adjust == 1.0);
        }
    }

    #[test]
    fn matching_ratios_need_no_adjustment() {
        let fit = compute_fit(200.0, 100.0, 400.0, 200.0).unwrap();
        assert_eq!(fit.width_adjust, 1.0);
        assert_eq!(fit.height_adjust, 1.0);
        assert!(close(fit.horz_translate, 0.0));
        assert!(close(fit.vert_translate, 0.0));
        let m = fit.matrix();
        assert!(close(m.e, 0.0) && close(m.f, 0.0));
    }

    #[test]
    fn placement_stays_inside_and_touches_one_axis() {
        for &(tw, th, sw, sh) in CASES {
            let fit = compute_fit(tw, th, sw, sh).unwrap();
            let r = fit.placement();
            assert!(r.llx >= -EPS && r.lly >= -EPS, "{r:?}");
            assert!(r.urx <= tw + EPS * tw && r.ury <= th + EPS * th, "{r:?}");

            let touches_x = close(r.llx, 0.0) && close(r.urx, tw);
            let touches_y = close(r.lly, 0.0) && close(r.ury, th);
            assert!(touches_x || touches_y, "{r:?} in {tw}x{th}");
        }
    }

    #[test]
    fn placement_preserves_aspect_and_centres() {
        for &(tw, th, sw, sh) in CASES {
            let fit = compute_fit(tw, th, sw, sh).unwrap();
            let r = fit.placement();
            assert!(close(r.width() / r.height(), sw / sh));
            // Equal margins on both sides of each axis.
            assert!(close(r.llx, tw - r.urx));
            assert!(close(r.lly, th - r.ury));
        }
    }

    #[test]
    fn tall_image_in_wide_widget_compresses_width() {
        let fit = compute_fit(300.0, 100.0, 100.0, 100.0).unwrap();
        assert!(close(fit.width_adjust, 1.0 / 3.0));
        assert_eq!(fit.height_adjust, 1.0);
        assert!(close(fit.scale, 1.0));
        assert!(close(fit.horz_translate, 100.0));
        assert!(close(fit.vert_translate, 0.0));

        let m = fit.matrix();
        assert!(close(m.a, 100.0 / 3.0));
        assert!(close(m.d, 100.0));
        assert_eq!((m.b, m.c), (0.0, 0.0));
        assert!(close(m.e, 100.0 / 3.0));

        let r = fit.placement();
        assert!(close(r.llx, 100.0) && close(r.urx, 200.0));
    }

    #[test]
    fn zero_target_width_is_rejected() {
        assert!(matches!(
            compute_fit(0.0, 100.0, 10.0, 10.0),
            Err(FolioError::DegenerateInput(_))
        ));
    }

    #[test]
    fn negative_and_nan_inputs_are_rejected() {
        assert!(compute_fit(10.0, -1.0, 10.0, 10.0).is_err());
        assert!(compute_fit(10.0, 10.0, 0.0, 10.0).is_err());
        assert!(compute_fit(10.0, 10.0, 10.0, f64::NAN).is_err());
        assert!(compute_fit(f64::INFINITY, 10.0, 10.0, 10.0).is_err());
    }

    #[test]
    fn matrix_composition_order() {
        let m = Matrix2D::scale(2.0, 3.0).then(&Matrix2D::translate(5.0, 7.0));
        assert_eq!(m.transform_point(1.0, 1.0), (7.0, 10.0));
        let n = Matrix2D::translate(5.0, 7.0).then(&Matrix2D::scale(2.0, 3.0));
        assert_eq!(n.transform_point(1.0, 1.0), (12.0, 24.0));
        assert_eq!(Matrix2D::default(), Matrix2D::IDENTITY);
    }
}
