use core::num::NonZeroU32;
use std::collections::VecDeque;

use log::{debug, info, trace};

use crate::{
    fractal::Fractal,
    rectangle::Rectangle,
    scheduler,
    value_grid::{GridWriter, ValueGrid},
    Error,
};

/// Fills the grid with smoothed escape counts for `fractal`.
///
/// The grid is split into one tile per worker and evaluated in parallel.
/// With `quad_size` of 1 every cell is computed; larger values enable the
/// adaptive mode, where each worker subdivides its tile into quads of at
/// most that edge length and fills sufficiently uniform quads by bilinear
/// interpolation of their corners instead of computing them. `threshold` is
/// the mean-absolute-deviation bound on the corner values below which a quad
/// counts as uniform.
///
/// # Errors
///
/// Fails when the grid is smaller than 2×2 or when a worker reports an
/// error.
pub fn compute_values(
    grid: &mut ValueGrid,
    fractal: &Fractal,
    quad_size: NonZeroU32,
    threshold: f64,
) -> Result<(), Error> {
    if grid.width() < 2 || grid.height() < 2 {
        return Err(Error::GridTooSmall {
            width: grid.width(),
            height: grid.height(),
        });
    }

    info!("computing fractal values");
    let bounds = Rectangle::new(0, 0, grid.width() - 1, grid.height() - 1);
    let writer = grid.writer();
    scheduler::for_each_tile(bounds, |tile| {
        evaluate_tile(&writer, fractal, &tile, quad_size.get(), threshold);
        Ok(())
    })?;
    info!("computing fractal values: done");

    Ok(())
}

/// Evaluates one scheduler tile, subdividing it when interpolation is on.
fn evaluate_tile(
    grid: &GridWriter<'_>,
    fractal: &Fractal,
    tile: &Rectangle,
    quad_size: u32,
    threshold: f64,
) {
    debug!(
        "computing values in ({},{})-({},{})",
        tile.x1, tile.y1, tile.x2, tile.y2
    );

    if quad_size == 1 {
        evaluate_pointwise(grid, fractal, tile);
    } else {
        // Subdivide until no quad edge exceeds quad_size. Each cut strictly
        // shrinks the longer dimension, so the work list drains.
        let mut work = VecDeque::new();
        let mut leaves = VecDeque::new();
        work.push_back(*tile);
        while let Some(quad) = work.pop_front() {
            if quad.x2 - quad.x1 > quad_size || quad.y2 - quad.y1 > quad_size {
                let (first, second) = quad.cut_in_half();
                work.push_back(first);
                work.push_back(second);
            } else {
                leaves.push_back(quad);
            }
        }

        while let Some(leaf) = leaves.pop_front() {
            evaluate_leaf(grid, fractal, &leaf, threshold);
        }
    }

    debug!(
        "computing values in ({},{})-({},{}): done",
        tile.x1, tile.y1, tile.x2, tile.y2
    );
}

/// Computes every cell of `tile` directly.
fn evaluate_pointwise(grid: &GridWriter<'_>, fractal: &Fractal, tile: &Rectangle) {
    let (width, height) = (grid.width(), grid.height());
    for y in tile.y1..=tile.y2 {
        for x in tile.x1..=tile.x2 {
            // SAFETY: (x, y) lies in this worker's tile.
            unsafe { grid.set(x, y, fractal.value_for_cell(width, height, x, y)) };
        }
    }
}

/// Evaluates a leaf quad: computes the four corners, then either fills the
/// interior by bilinear interpolation or computes it cell by cell, reusing
/// the corners either way.
fn evaluate_leaf(grid: &GridWriter<'_>, fractal: &Fractal, leaf: &Rectangle, threshold: f64) {
    let (width, height) = (grid.width(), grid.height());
    let corners = [
        fractal.value_for_cell(width, height, leaf.x1, leaf.y1),
        fractal.value_for_cell(width, height, leaf.x2, leaf.y1),
        fractal.value_for_cell(width, height, leaf.x1, leaf.y2),
        fractal.value_for_cell(width, height, leaf.x2, leaf.y2),
    ];
    let interpolate = quad_can_be_interpolated(&corners, threshold);
    trace!(
        "quad ({},{})-({},{}) {}",
        leaf.x1,
        leaf.y1,
        leaf.x2,
        leaf.y2,
        if interpolate { "interpolated" } else { "computed" }
    );

    let extent_x = f64::from(leaf.x2 - leaf.x1);
    let extent_y = f64::from(leaf.y2 - leaf.y1);
    for y in leaf.y1..=leaf.y2 {
        // A degenerate axis keeps the corner coordinate.
        let fy = if extent_y == 0.0 {
            0.0
        } else {
            f64::from(y - leaf.y1) / extent_y
        };
        for x in leaf.x1..=leaf.x2 {
            let value = if x == leaf.x1 && y == leaf.y1 {
                corners[0]
            } else if x == leaf.x2 && y == leaf.y1 {
                corners[1]
            } else if x == leaf.x1 && y == leaf.y2 {
                corners[2]
            } else if x == leaf.x2 && y == leaf.y2 {
                corners[3]
            } else if interpolate {
                let fx = if extent_x == 0.0 {
                    0.0
                } else {
                    f64::from(x - leaf.x1) / extent_x
                };
                quad_lerp(&corners, fx, fy)
            } else {
                fractal.value_for_cell(width, height, x, y)
            };
            // SAFETY: (x, y) lies in this worker's tile.
            unsafe { grid.set(x, y, value) };
        }
    }
}

/// Whether a quad is uniform enough to fill from its corners.
///
/// A negative corner marks a cell inside the set, which is not numerically
/// comparable with escape counts: such a quad straddles the set boundary and
/// must be computed, unless all four corners are inside (then the whole quad
/// is filled with the inside marker).
fn quad_can_be_interpolated(corners: &[f64; 4], threshold: f64) -> bool {
    if corners.iter().any(|&corner| corner < 0.0) {
        return corners.iter().all(|&corner| corner < 0.0);
    }

    let average = corners.iter().sum::<f64>() / 4.0;
    let deviation = corners
        .iter()
        .map(|corner| (corner - average).abs())
        .sum::<f64>()
        / 4.0;

    deviation < threshold
}

/// Bilinear blend of the corner values at normalised `(x, y)`, with corners
/// ordered `[top-left, top-right, bottom-left, bottom-right]`.
fn quad_lerp(corners: &[f64; 4], x: f64, y: f64) -> f64 {
    (corners[0] * (1.0 - x) + corners[1] * x) * (1.0 - y)
        + (corners[2] * (1.0 - x) + corners[3] * x) * y
}

#[cfg(test)]
mod test_evaluator {
    use approx::assert_relative_eq;

    use crate::fractal::{FractalKind, INSIDE};

    use super::*;

    fn mandelbrot() -> Fractal {
        Fractal::new(FractalKind::Mandelbrot, -2.0, -1.2, 0.5, 1.2, 4.0, 128)
    }

    fn reference_grid(fractal: &Fractal, width: u32, height: u32) -> ValueGrid {
        let mut grid = ValueGrid::new(width, height);
        let writer = grid.writer();
        for y in 0..height {
            for x in 0..width {
                // SAFETY: in bounds, single writer.
                unsafe { writer.set(x, y, fractal.value_for_cell(width, height, x, y)) };
            }
        }
        grid
    }

    #[test]
    fn pointwise_evaluation_matches_the_reference_exactly() {
        let fractal = mandelbrot();
        let reference = reference_grid(&fractal, 64, 48);
        let mut grid = ValueGrid::new(64, 48);
        compute_values(&mut grid, &fractal, NonZeroU32::new(1).unwrap(), 0.5).unwrap();
        assert_eq!(grid.values(), reference.values());
    }

    #[test]
    fn zero_threshold_never_interpolates_across_escape_values() {
        let fractal = mandelbrot();
        let reference = reference_grid(&fractal, 96, 96);
        let mut grid = ValueGrid::new(96, 96);
        compute_values(&mut grid, &fractal, NonZeroU32::new(8).unwrap(), 0.0).unwrap();

        // With a zero threshold only all-inside quads are filled from their
        // corners, so every escape value must match the reference exactly.
        for (&adaptive, &exact) in grid.values().iter().zip(reference.values()) {
            if adaptive >= 0.0 {
                assert_eq!(adaptive, exact);
            }
        }
    }

    #[test]
    fn adaptive_evaluation_stays_close_to_pointwise() {
        let fractal = mandelbrot();
        let reference = reference_grid(&fractal, 128, 128);
        let mut grid = ValueGrid::new(128, 128);
        compute_values(&mut grid, &fractal, NonZeroU32::new(16).unwrap(), 0.01).unwrap();

        let mut total_error = 0.0;
        let mut compared = 0_u32;
        for (&adaptive, &exact) in grid.values().iter().zip(reference.values()) {
            if adaptive >= 0.0 && exact >= 0.0 {
                total_error += (adaptive - exact).abs();
                compared += 1;
            }
        }
        assert!(compared > 0);
        assert!(total_error / f64::from(compared) < 0.02);
    }

    #[test]
    fn grid_cells_hold_the_marker_or_finite_escape_counts() {
        let fractal = mandelbrot();
        let mut grid = ValueGrid::new(80, 60);
        compute_values(&mut grid, &fractal, NonZeroU32::new(16).unwrap(), 0.05).unwrap();
        assert!(grid
            .values()
            .iter()
            .all(|&value| value == INSIDE || (value >= 0.0 && value.is_finite())));
    }

    #[test]
    fn a_tiny_grid_is_rejected() {
        let fractal = mandelbrot();
        let mut grid = ValueGrid::new(1, 10);
        assert!(matches!(
            compute_values(&mut grid, &fractal, NonZeroU32::new(1).unwrap(), 0.0),
            Err(Error::GridTooSmall { .. })
        ));
    }

    #[test]
    fn a_single_inside_corner_blocks_interpolation() {
        assert!(!quad_can_be_interpolated(&[INSIDE, 1.0, 1.0, 1.0], 1.0));
        assert!(!quad_can_be_interpolated(&[1.0, INSIDE, 1.0, INSIDE], 1.0));
        assert!(quad_can_be_interpolated(
            &[INSIDE, INSIDE, INSIDE, INSIDE],
            0.0
        ));
    }

    #[test]
    fn uniform_corners_interpolate_and_dissimilar_ones_do_not() {
        assert!(quad_can_be_interpolated(&[1.0, 1.0, 1.0, 1.0], 1e-9));
        assert!(quad_can_be_interpolated(&[1.0, 1.01, 0.99, 1.0], 0.1));
        assert!(!quad_can_be_interpolated(&[1.0, 2.0, 1.0, 1.0], 0.1));
    }

    #[test]
    fn the_bilinear_blend_reproduces_corners_and_averages_the_center() {
        let corners = [1.0, 3.0, 5.0, 7.0];
        assert_relative_eq!(quad_lerp(&corners, 0.0, 0.0), 1.0);
        assert_relative_eq!(quad_lerp(&corners, 1.0, 0.0), 3.0);
        assert_relative_eq!(quad_lerp(&corners, 0.0, 1.0), 5.0);
        assert_relative_eq!(quad_lerp(&corners, 1.0, 1.0), 7.0);
        assert_relative_eq!(quad_lerp(&corners, 0.5, 0.5), 4.0);
    }
}
