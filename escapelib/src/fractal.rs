use core::f64::consts::LN_2;

/// Marks a grid cell whose point never escaped: it is inside the set.
pub const INSIDE: f64 = -1.0;

/// The escape-time recurrences that can be rendered.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FractalKind {
    /// `z ← z² + c` from `z₀ = 0`, where `c` is the sampled point.
    Mandelbrot,
    /// `z ← z² + c` from `z₀ =` the sampled point, with a fixed `c`.
    Julia { c_re: f64, c_im: f64 },
}

/// Immutable description of a fractal and the rectangle of the complex plane
/// to render. Shared read-only between all workers of a render.
#[derive(Debug, Clone, Copy)]
pub struct Fractal {
    kind: FractalKind,
    x1: f64,
    y1: f64,
    x2: f64,
    y2: f64,
    /// Escape threshold compared against `|z|²`, i.e. already squared.
    escape_radius: f64,
    max_iterations: u32,
}

impl Fractal {
    #[must_use]
    pub fn new(
        kind: FractalKind,
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
        escape_radius: f64,
        max_iterations: u32,
    ) -> Self {
        debug_assert!(x1 <= x2 && y1 <= y2);
        debug_assert!(escape_radius > 0.0);
        Self {
            kind,
            x1,
            y1,
            x2,
            y2,
            escape_radius,
            max_iterations,
        }
    }

    /// Builds the window from its center point and side lengths.
    #[must_use]
    pub fn from_center(
        kind: FractalKind,
        center_x: f64,
        center_y: f64,
        span_x: f64,
        span_y: f64,
        escape_radius: f64,
        max_iterations: u32,
    ) -> Self {
        Self::new(
            kind,
            center_x - span_x / 2.0,
            center_y - span_y / 2.0,
            center_x + span_x / 2.0,
            center_y + span_y / 2.0,
            escape_radius,
            max_iterations,
        )
    }

    /// The smoothed escape count at a point of the complex plane, or
    /// [`INSIDE`] if the orbit stays bounded for the maximum iteration count.
    ///
    /// The count is `√(n + ln(ln R / ln |z|²) / ln 2)`: the logarithmic term
    /// removes the banding of whole iteration counts and the square root is a
    /// purely visual remapping. An orbit landing exactly on `|z|² = R` yields
    /// `√n` since `ln(1) = 0`.
    #[must_use]
    pub fn value_at(&self, x: f64, y: f64) -> f64 {
        let ((mut z_re, mut z_im), (c_re, c_im)) = match self.kind {
            FractalKind::Mandelbrot => ((0.0, 0.0), (x, y)),
            FractalKind::Julia { c_re, c_im } => ((x, y), (c_re, c_im)),
        };

        let mut norm = 0.0;
        let mut n = 0;
        while n < self.max_iterations && norm < self.escape_radius {
            let re = z_re * z_re - z_im * z_im + c_re;
            z_im = 2.0 * z_re * z_im + c_im;
            z_re = re;
            norm = z_re * z_re + z_im * z_im;
            n += 1;
        }

        if norm < self.escape_radius {
            INSIDE
        } else {
            let smoothing = (self.escape_radius.ln() / norm.ln()).ln() / LN_2;
            (f64::from(n) + smoothing).sqrt()
        }
    }

    /// The value for cell `(x, y)` of a `width`×`height` grid spanning the
    /// window, with the corner cells landing exactly on the window corners.
    /// Both dimensions must be at least 2.
    pub(crate) fn value_for_cell(&self, width: u32, height: u32, x: u32, y: u32) -> f64 {
        debug_assert!(width >= 2 && height >= 2);
        let fx = (self.x1 * f64::from(width - 1) + f64::from(x) * (self.x2 - self.x1))
            / f64::from(width - 1);
        let fy = (self.y1 * f64::from(height - 1) + f64::from(y) * (self.y2 - self.y1))
            / f64::from(height - 1);
        self.value_at(fx, fy)
    }
}
