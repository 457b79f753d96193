use color_depth::Color;
use itertools::Itertools;
use log::{debug, info};

use crate::{image::Image, scheduler, Error};

/// A small convolution kernel with an anchor cell.
///
/// The Gaussian constructors build one-dimensional kernels normalised to
/// sum 1; applying the horizontal and the vertical variant in sequence
/// matches a full two-dimensional Gaussian up to floating-point rounding at
/// a fraction of the per-pixel cost.
#[derive(Debug, Clone)]
pub struct Filter {
    width: u32,
    height: u32,
    anchor_x: u32,
    anchor_y: u32,
    data: Vec<f64>,
}

impl Filter {
    #[must_use]
    pub fn new(width: u32, height: u32, anchor_x: u32, anchor_y: u32, data: Vec<f64>) -> Self {
        debug_assert_eq!(data.len(), width as usize * height as usize);
        debug_assert!(anchor_x < width && anchor_y < height);
        Self {
            width,
            height,
            anchor_x,
            anchor_y,
            data,
        }
    }

    /// A 1×(2r+1) Gaussian with `r = ⌈3σ⌉` rounded up to odd.
    ///
    /// # Errors
    ///
    /// Fails when `sigma` is not positive.
    pub fn horizontal_gaussian(sigma: f64) -> Result<Self, Error> {
        if sigma <= 0.0 {
            return Err(Error::InvalidSigma(sigma));
        }
        let radius = gaussian_radius(sigma);
        let mut filter = Self::new(2 * radius + 1, 1, radius, 0, gaussian_taps(sigma, radius));
        filter.normalize();
        Ok(filter)
    }

    /// A (2r+1)×1 Gaussian with `r = ⌈3σ⌉` rounded up to odd.
    ///
    /// # Errors
    ///
    /// Fails when `sigma` is not positive.
    pub fn vertical_gaussian(sigma: f64) -> Result<Self, Error> {
        if sigma <= 0.0 {
            return Err(Error::InvalidSigma(sigma));
        }
        let radius = gaussian_radius(sigma);
        let mut filter = Self::new(1, 2 * radius + 1, 0, radius, gaussian_taps(sigma, radius));
        filter.normalize();
        Ok(filter)
    }

    /// [`Self::horizontal_gaussian`] with `σ = radius / 3`.
    ///
    /// # Errors
    ///
    /// Fails when `radius` is not positive.
    pub fn horizontal_gaussian_from_radius(radius: f64) -> Result<Self, Error> {
        if radius <= 0.0 {
            return Err(Error::InvalidRadius(radius));
        }
        Self::horizontal_gaussian(radius / 3.0)
    }

    /// [`Self::vertical_gaussian`] with `σ = radius / 3`.
    ///
    /// # Errors
    ///
    /// Fails when `radius` is not positive.
    pub fn vertical_gaussian_from_radius(radius: f64) -> Result<Self, Error> {
        if radius <= 0.0 {
            return Err(Error::InvalidRadius(radius));
        }
        Self::vertical_gaussian(radius / 3.0)
    }

    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    #[must_use]
    pub const fn anchor_x(&self) -> u32 {
        self.anchor_x
    }

    #[must_use]
    pub const fn anchor_y(&self) -> u32 {
        self.anchor_y
    }

    #[must_use]
    pub fn value_at(&self, x: u32, y: u32) -> f64 {
        self.data[(y * self.width + x) as usize]
    }

    /// Scales the taps so they sum to 1. A kernel summing to zero cannot be
    /// normalised and is left untouched.
    pub fn normalize(&mut self) {
        let sum: f64 = self.data.iter().sum();
        if sum != 0.0 {
            for tap in &mut self.data {
                *tap /= sum;
            }
        }
    }

    /// Convolves the kernel with `src` around `(x, y)`, sampling out-of-range
    /// pixels clamp-to-edge.
    pub(crate) fn apply_to_pixel(&self, src: &Image, x: i64, y: i64) -> Color {
        let (mut r, mut g, mut b) = (0.0_f64, 0.0_f64, 0.0_f64);
        for (j, i) in (0..self.height).cartesian_product(0..self.width) {
            let color = src.pixel_clamped(
                x - i64::from(self.anchor_x) + i64::from(i),
                y - i64::from(self.anchor_y) + i64::from(j),
            );
            let weight = self.value_at(i, j);
            r += f64::from(color.red()) * weight;
            g += f64::from(color.green()) * weight;
            b += f64::from(color.blue()) * weight;
        }

        let max = f64::from(src.depth().max_component());
        Color::new(
            src.depth(),
            r.round().clamp(0.0, max) as u16,
            g.round().clamp(0.0, max) as u16,
            b.round().clamp(0.0, max) as u16,
        )
    }
}

/// Kernel radius for `sigma`: `⌈3σ⌉` rounded up to odd.
fn gaussian_radius(sigma: f64) -> u32 {
    let mut radius = (3.0 * sigma).ceil() as u32;
    if radius % 2 == 0 {
        radius += 1;
    }
    radius
}

fn gaussian_taps(sigma: f64, radius: u32) -> Vec<f64> {
    let two_sigma_sqr = 2.0 * sigma * sigma;
    let radius = i64::from(radius);
    (-radius..=radius)
        .map(|i| (-((i * i) as f64) / two_sigma_sqr).exp())
        .collect()
}

/// Applies `filter` to every pixel of `src`, writing the result into `dst`
/// and fanning the work out over the scheduler's tiles.
///
/// # Errors
///
/// Fails when the images differ in size or a worker reports an error.
pub fn apply_filter(dst: &mut Image, src: &Image, filter: &Filter) -> Result<(), Error> {
    if dst.width() != src.width() || dst.height() != src.height() {
        return Err(Error::DimensionMismatch {
            expected_width: src.width(),
            expected_height: src.height(),
            width: dst.width(),
            height: dst.height(),
        });
    }

    info!("applying filter");
    let bounds = dst.bounds();
    let writer = dst.writer();
    scheduler::for_each_tile(bounds, |tile| {
        debug!(
            "filtering ({},{})-({},{})",
            tile.x1, tile.y1, tile.x2, tile.y2
        );
        for y in tile.y1..=tile.y2 {
            for x in tile.x1..=tile.x2 {
                // SAFETY: (x, y) lies in this worker's tile.
                unsafe {
                    writer.put(x, y, filter.apply_to_pixel(src, i64::from(x), i64::from(y)));
                }
            }
        }
        Ok(())
    })?;
    info!("applying filter: done");

    Ok(())
}
