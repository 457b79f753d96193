use core::num::NonZeroU32;

use color_depth::{Color, ColorDepth};
use log::{debug, info};

use crate::{
    evaluator::compute_values,
    fractal::Fractal,
    gradient::Gradient,
    image::{downscale, gaussian_blur, Image},
    scheduler,
    value_grid::ValueGrid,
    Error,
};

/// How the rendered image is anti-aliased.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AntiAliasing {
    None,
    /// Convolve the finished image with separable Gaussians of this radius.
    GaussianBlur { radius: f64 },
    /// Evaluate at `factor` times the resolution, then downscale.
    Oversampling { factor: f64 },
}

/// Gradient, space colour and value scaling used to turn escape counts into
/// pixels. Shared read-only between all workers of a render.
#[derive(Debug, Clone)]
pub struct RenderingParameters {
    pub gradient: Gradient,
    /// Colour of cells inside the set.
    pub space_color: Color,
    /// Scale applied (squared) to a cell value before the gradient lookup.
    pub multiplier: f64,
}

/// Resolution, colour depth and evaluation settings for one render.
#[derive(Debug, Clone, Copy)]
pub struct RenderOptions {
    pub width: NonZeroU32,
    pub height: NonZeroU32,
    pub depth: ColorDepth,
    /// Maximum quad edge eligible for corner interpolation; 1 computes
    /// every cell.
    pub quad_size: NonZeroU32,
    /// Corner dissimilarity above which a quad is computed rather than
    /// interpolated.
    pub threshold: f64,
    pub anti_aliasing: AntiAliasing,
}

/// Maps a populated value grid onto `image` through the gradient.
///
/// Cells inside the set get the space colour; every other cell indexes the
/// gradient with `⌊value · multiplier²⌋`.
///
/// # Errors
///
/// Fails when image and grid differ in size or a worker reports an error.
pub fn render_values(
    image: &mut Image,
    grid: &ValueGrid,
    parameters: &RenderingParameters,
) -> Result<(), Error> {
    if image.width() != grid.width() || image.height() != grid.height() {
        return Err(Error::DimensionMismatch {
            expected_width: grid.width(),
            expected_height: grid.height(),
            width: image.width(),
            height: image.height(),
        });
    }

    info!("rendering fractal");
    let multiplier_sqr = parameters.multiplier * parameters.multiplier;
    let bounds = image.bounds();
    let writer = image.writer();
    scheduler::for_each_tile(bounds, |tile| {
        debug!(
            "rendering ({},{})-({},{})",
            tile.x1, tile.y1, tile.x2, tile.y2
        );
        for y in tile.y1..=tile.y2 {
            for x in tile.x1..=tile.x2 {
                let value = grid.value(x, y);
                let color = if value < 0.0 {
                    parameters.space_color
                } else {
                    parameters.gradient.color_at((value * multiplier_sqr) as u32)
                };
                // SAFETY: (x, y) lies in this worker's tile.
                unsafe { writer.put(x, y, color) };
            }
        }
        Ok(())
    })?;
    info!("rendering fractal: done");

    Ok(())
}

/// Renders the fractal to a finished image: evaluates the value grid, maps
/// it through the gradient and applies the selected anti-aliasing.
///
/// # Errors
///
/// Propagates failures of any pipeline stage; additionally fails when an
/// oversampling factor is not greater than 1.
pub fn render_fractal(
    fractal: &Fractal,
    parameters: &RenderingParameters,
    options: &RenderOptions,
) -> Result<Image, Error> {
    let width = options.width.get();
    let height = options.height.get();

    match options.anti_aliasing {
        AntiAliasing::None => render_plain(fractal, parameters, options, width, height),
        AntiAliasing::GaussianBlur { radius } => {
            let plain = render_plain(fractal, parameters, options, width, height)?;
            let mut blurred = Image::new(width, height, options.depth);
            gaussian_blur(&mut blurred, &plain, radius)?;
            Ok(blurred)
        }
        AntiAliasing::Oversampling { factor } => {
            if factor <= 1.0 {
                return Err(Error::InvalidOversamplingFactor(factor));
            }
            let wide = (f64::from(width) * factor).ceil() as u32;
            let tall = (f64::from(height) * factor).ceil() as u32;
            let oversampled = render_plain(fractal, parameters, options, wide, tall)?;
            let mut output = Image::new(width, height, options.depth);
            downscale(&mut output, &oversampled)?;
            Ok(output)
        }
    }
}

/// Evaluates and colours a value grid at the given resolution.
fn render_plain(
    fractal: &Fractal,
    parameters: &RenderingParameters,
    options: &RenderOptions,
    width: u32,
    height: u32,
) -> Result<Image, Error> {
    let mut grid = ValueGrid::new(width, height);
    compute_values(&mut grid, fractal, options.quad_size, options.threshold)?;
    let mut image = Image::new(width, height, options.depth);
    render_values(&mut image, &grid, parameters)?;
    Ok(image)
}

#[cfg(test)]
mod test_render {
    use crate::fractal::FractalKind;

    use super::*;

    fn parameters() -> RenderingParameters {
        let stops = [
            Color::from_packed32(0x000000),
            Color::from_packed32(0xff8800),
            Color::from_packed32(0xffffff),
        ];
        RenderingParameters {
            gradient: Gradient::new(&stops, 64).unwrap(),
            space_color: Color::from_packed32(0x202020),
            multiplier: 1.0,
        }
    }

    #[test]
    fn inside_cells_get_the_space_colour_and_escapes_hit_the_gradient() {
        let mut grid = ValueGrid::new(4, 2);
        {
            let writer = grid.writer();
            for y in 0..2 {
                for x in 0..4 {
                    // SAFETY: in bounds, single writer.
                    unsafe { writer.set(x, y, -1.0) };
                }
            }
            // SAFETY: in bounds, single writer.
            unsafe { writer.set(2, 1, 3.7) };
        }

        let parameters = parameters();
        let mut image = Image::new(4, 2, ColorDepth::Eight);
        render_values(&mut image, &grid, &parameters).unwrap();

        assert_eq!(image.pixel(0, 0), parameters.space_color);
        assert_eq!(image.pixel(3, 1), parameters.space_color);
        assert_eq!(image.pixel(2, 1), parameters.gradient.color_at(3));
    }

    #[test]
    fn the_multiplier_is_squared_before_the_lookup() {
        let mut grid = ValueGrid::new(2, 2);
        {
            let writer = grid.writer();
            for y in 0..2 {
                for x in 0..2 {
                    // SAFETY: in bounds, single writer.
                    unsafe { writer.set(x, y, 5.0) };
                }
            }
        }

        let mut parameters = parameters();
        parameters.multiplier = 3.0;
        let mut image = Image::new(2, 2, ColorDepth::Eight);
        render_values(&mut image, &grid, &parameters).unwrap();
        assert_eq!(image.pixel(0, 0), parameters.gradient.color_at(45));
    }

    #[test]
    fn mismatched_grid_and_image_sizes_are_rejected() {
        let grid = ValueGrid::new(4, 4);
        let mut image = Image::new(4, 5, ColorDepth::Eight);
        assert!(matches!(
            render_values(&mut image, &grid, &parameters()),
            Err(Error::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn an_oversampling_factor_of_one_is_rejected() {
        let fractal = Fractal::new(FractalKind::Mandelbrot, -2.0, -1.2, 0.5, 1.2, 4.0, 64);
        let options = RenderOptions {
            width: NonZeroU32::new(16).unwrap(),
            height: NonZeroU32::new(16).unwrap(),
            depth: ColorDepth::Eight,
            quad_size: NonZeroU32::new(1).unwrap(),
            threshold: 0.0,
            anti_aliasing: AntiAliasing::Oversampling { factor: 1.0 },
        };
        assert!(matches!(
            render_fractal(&fractal, &parameters(), &options),
            Err(Error::InvalidOversamplingFactor(_))
        ));
    }
}
