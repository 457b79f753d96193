use core::num::NonZeroU32;
use std::{error::Error, process::ExitCode};

use clap::Parser;
use image::{DynamicImage, ImageBuffer, Rgb};
use log::{info, LevelFilter};
use rayon::ThreadPoolBuilder;

use color_depth::ColorDepth;
use escapelib::{
    render_fractal, AntiAliasing, Fractal, FractalKind, Gradient, Image, RenderOptions,
    RenderingParameters,
};

use crate::command_line_interface::Cli;
use crate::config::{Config, FractalDescriptor};

mod command_line_interface;
mod config;

/// Samples per gradient transition; enough that neighbouring table entries
/// differ by at most one component step.
const GRADIENT_SAMPLES: u32 = 1024;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("error: {error}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let args = Cli::parse();

    init_logging(&args);

    if let Some(jobs) = args.jobs {
        ThreadPoolBuilder::new()
            .num_threads(jobs.get())
            .build_global()?;
    }

    let config = Config::from_file(&args.config)?;
    let descriptor = args
        .fractal
        .as_deref()
        .map(FractalDescriptor::from_file)
        .transpose()?;

    let fractal = match descriptor {
        Some(descriptor) => descriptor.into_fractal(),
        None => Fractal::from_center(
            FractalKind::Mandelbrot,
            config.center_x,
            config.center_y,
            config.span_x,
            config.span_y,
            config.escape_radius,
            config.max_iterations,
        ),
    };
    let (span_x, span_y) = match descriptor {
        Some(descriptor) => (descriptor.span_x, descriptor.span_y),
        None => (config.span_x, config.span_y),
    };
    let (width, height) = resolve_resolution(&args, span_x, span_y)?;

    let parameters = RenderingParameters {
        gradient: Gradient::new(&config.gradient_stops, GRADIENT_SAMPLES)?,
        space_color: config.space_color,
        multiplier: config.multiplier,
    };
    let options = RenderOptions {
        width,
        height,
        depth: config.depth,
        quad_size: args.quad_size,
        threshold: args.threshold,
        anti_aliasing: if let Some(radius) = args.blur {
            AntiAliasing::GaussianBlur { radius }
        } else if let Some(factor) = args.oversampling {
            AntiAliasing::Oversampling { factor }
        } else {
            AntiAliasing::None
        },
    };

    let image = render_fractal(&fractal, &parameters, &options)?;

    info!("saving image to {}", args.output.display());
    to_dynamic_image(&image)
        .save(&args.output)
        .map_err(|error| format!("could not write {}: {error}", args.output.display()))?;
    info!("saving image to {}: done", args.output.display());

    Ok(())
}

fn init_logging(args: &Cli) {
    let level = if args.debug {
        LevelFilter::Trace
    } else if args.verbose {
        LevelFilter::Debug
    } else if args.quiet {
        LevelFilter::Warn
    } else {
        LevelFilter::Info
    };
    env_logger::Builder::new().filter_level(level).init();
}

/// Completes the output resolution, deriving a missing dimension from the
/// window's aspect ratio. At least one dimension must be given.
fn resolve_resolution(
    args: &Cli,
    span_x: f64,
    span_y: f64,
) -> Result<(NonZeroU32, NonZeroU32), String> {
    match (args.width, args.height) {
        (Some(width), Some(height)) => Ok((width, height)),
        (Some(width), None) => {
            let height = (f64::from(width.get()) * span_y / span_x).round() as u32;
            NonZeroU32::new(height.max(1))
                .map(|height| (width, height))
                .ok_or_else(|| "could not derive an image height".into())
        }
        (None, Some(height)) => {
            let width = (f64::from(height.get()) * span_x / span_y).round() as u32;
            NonZeroU32::new(width.max(1))
                .map(|width| (width, height))
                .ok_or_else(|| "could not derive an image width".into())
        }
        (None, None) => Err("at least one of --width and --height must be given".into()),
    }
}

/// Repacks the rendered image for encoding; 16-bit renders stay 16-bit.
fn to_dynamic_image(image: &Image) -> DynamicImage {
    match image.depth() {
        ColorDepth::Eight => {
            let mut buffer =
                ImageBuffer::<Rgb<u8>, Vec<u8>>::new(image.width(), image.height());
            for (x, y, pixel) in buffer.enumerate_pixels_mut() {
                *pixel = image.pixel(x, y).into();
            }
            DynamicImage::ImageRgb8(buffer)
        }
        ColorDepth::Sixteen => {
            let mut buffer =
                ImageBuffer::<Rgb<u16>, Vec<u16>>::new(image.width(), image.height());
            for (x, y, pixel) in buffer.enumerate_pixels_mut() {
                *pixel = image.pixel(x, y).into();
            }
            DynamicImage::ImageRgb16(buffer)
        }
    }
}
