//! Parallel rendering of escape-time fractals (Mandelbrot and Julia sets).
//!
//! A render runs in stages: the [`Fractal`] descriptor is evaluated into a
//! [`ValueGrid`] of smoothed escape counts ([`compute_values`]), the grid is
//! mapped through a [`Gradient`] onto an [`Image`] ([`render_values`]), and
//! an optional anti-aliasing step blurs the image or downscales an
//! oversampled one. Every stage fans its work out over disjoint rectangular
//! tiles, one per worker of the global rayon pool, and joins before the next
//! stage starts. [`render_fractal`] drives the whole pipeline.

mod error;
mod evaluator;
mod filter;
mod fractal;
mod gradient;
mod image;
mod rectangle;
mod render;
mod scheduler;
mod value_grid;

pub use error::Error;
pub use evaluator::compute_values;
pub use filter::{apply_filter, Filter};
pub use fractal::{Fractal, FractalKind, INSIDE};
pub use gradient::Gradient;
pub use image::{downscale, gaussian_blur, Image};
pub use rectangle::Rectangle;
pub use render::{render_fractal, render_values, AntiAliasing, RenderOptions, RenderingParameters};
pub use value_grid::ValueGrid;
