use core::num::{NonZeroU32, NonZeroUsize};
use std::path::PathBuf;

use clap::Parser;

/// Renders an escape-time fractal (Mandelbrot or Julia set) described by a
/// configuration file to an image file, evaluating it in parallel and
/// optionally anti-aliasing the result by Gaussian blur or oversampling.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    // This struct contains the runtime specified configuration of the program.
    #[arg(short, long, conflicts_with = "verbose")]
    /// Print only warnings and errors
    pub quiet: bool,

    #[arg(short, long)]
    /// Print per-tile progress information
    pub verbose: bool,

    #[arg(short, long)]
    /// Print debugging output
    pub debug: bool,

    #[arg(short, long, value_name = "THREADS")]
    /// The number of worker threads (defaults to the number of logical CPUs)
    pub jobs: Option<NonZeroUsize>,

    #[arg(short, long, value_name = "CONFIG FILE")]
    /// The configuration file: render window, iteration limit, multiplier,
    /// space colour and gradient stops
    pub config: PathBuf,

    #[arg(short, long, value_name = "FRACTAL FILE")]
    /// An optional fractal descriptor file whose fractal type and window
    /// override those of the configuration file
    pub fractal: Option<PathBuf>,

    #[arg(short, long, value_name = "OUTPUT FILE")]
    /// The output image path; the extension selects the format
    /// (.ppm writes raw PPM)
    pub output: PathBuf,

    #[arg(short = 'x', long, value_name = "WIDTH")]
    /// Output image width in pixels; derived from the height and the window
    /// aspect ratio when omitted
    pub width: Option<NonZeroU32>,

    #[arg(short = 'y', long, value_name = "HEIGHT")]
    /// Output image height in pixels; derived from the width and the window
    /// aspect ratio when omitted
    pub height: Option<NonZeroU32>,

    #[arg(
        short = 'i',
        long,
        value_name = "QUAD SIZE",
        // unwrap is okay because 5 is not 0.
        default_value_t = NonZeroU32::new(5).unwrap(),
    )]
    /// Maximum quad edge length eligible for corner interpolation during
    /// evaluation. A value of 1 disables interpolation and computes every
    /// pixel
    pub quad_size: NonZeroU32,

    #[arg(
        short,
        long,
        value_name = "THRESHOLD",
        default_value_t = 3.5e-3,
        value_parser = parse_threshold,
    )]
    /// Corner dissimilarity above which a quad is computed instead of
    /// interpolated; between 0 and 1
    pub threshold: f64,

    #[arg(
        short,
        long,
        value_name = "RADIUS",
        conflicts_with = "oversampling",
        value_parser = parse_blur_radius,
    )]
    /// Anti-alias with a Gaussian blur of this radius (fast)
    pub blur: Option<f64>,

    #[arg(
        short = 's',
        long,
        value_name = "FACTOR",
        value_parser = parse_oversampling_factor,
    )]
    /// Anti-alias by rendering at this multiple of the resolution and
    /// downscaling (slow, high quality)
    pub oversampling: Option<f64>,
}

fn parse_threshold(s: &str) -> Result<f64, String> {
    let value: f64 = s.parse().map_err(|_| format!("'{s}' is not a real number"))?;
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err("the dissimilarity threshold must be between 0 and 1".into())
    }
}

fn parse_blur_radius(s: &str) -> Result<f64, String> {
    let value: f64 = s.parse().map_err(|_| format!("'{s}' is not a real number"))?;
    if value > 0.0 {
        Ok(value)
    } else {
        Err("the blur radius must be larger than zero".into())
    }
}

fn parse_oversampling_factor(s: &str) -> Result<f64, String> {
    let value: f64 = s.parse().map_err(|_| format!("'{s}' is not a real number"))?;
    if value > 1.0 {
        Ok(value)
    } else {
        Err("the oversampling factor must be larger than one".into())
    }
}

#[cfg(test)]
mod test_cli {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn blur_and_oversampling_are_mutually_exclusive() {
        let result = Cli::try_parse_from([
            "escapetime", "-c", "conf", "-o", "out.ppm", "-x", "100", "-b", "3", "-s", "2",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn out_of_range_thresholds_are_rejected() {
        let result = Cli::try_parse_from([
            "escapetime", "-c", "conf", "-o", "out.ppm", "-x", "100", "-t", "1.5",
        ]);
        assert!(result.is_err());
    }
}
