use std::{fs, path::Path};

use color_depth::{Color, ColorDepth};
use escapelib::{Fractal, FractalKind};
use log::info;
use thiserror::Error;

/// Errors from loading the configuration or fractal descriptor files.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read at all.
    #[error("could not read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The file was read but does not describe a valid render.
    #[error("invalid {kind} file {path}: {reason}")]
    Invalid {
        kind: &'static str,
        path: String,
        reason: String,
    },
}

/// Render settings parsed from the configuration file: the default window,
/// iteration limit, value scaling and gradient colours.
#[derive(Debug, Clone)]
pub struct Config {
    pub center_x: f64,
    pub center_y: f64,
    pub span_x: f64,
    pub span_y: f64,
    pub escape_radius: f64,
    pub max_iterations: u32,
    pub multiplier: f64,
    pub space_color: Color,
    pub gradient_stops: Vec<Color>,
    pub depth: ColorDepth,
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        info!("reading configuration file {}", path.display());
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&text).map_err(|reason| ConfigError::Invalid {
            kind: "configuration",
            path: path.display().to_string(),
            reason,
        })
    }

    /// Parses the whitespace-separated token format
    /// `centerX centerY spanX spanY escapeRadius maxIter multiplier
    /// spaceColor T color1 .. colorT` with hex colours of 24 or 48 bits.
    fn parse(text: &str) -> Result<Self, String> {
        let mut tokens = Tokens::new(text);

        let center_x = tokens.real("centerX")?;
        let center_y = tokens.real("centerY")?;
        let span_x = tokens.positive_real("spanX")?;
        let span_y = tokens.positive_real("spanY")?;
        let escape_radius = tokens.positive_real("escape radius")?;
        let max_iterations = tokens.unsigned("maximum iteration count")?;
        let multiplier = tokens.positive_real("multiplier")?;
        let space_color = tokens.hex_color("space colour")?;

        let stop_count = tokens.unsigned("stop colour count")?;
        if stop_count < 2 {
            return Err(format!(
                "the number of stop colours must be at least 2, got {stop_count}"
            ));
        }
        let mut gradient_stops = Vec::with_capacity(stop_count as usize);
        for i in 0..stop_count {
            gradient_stops.push(tokens.hex_color(&format!("stop colour {}", i + 1))?);
        }

        // A single 16-bit colour makes the whole render 16-bit.
        let depth = if space_color.depth() == ColorDepth::Sixteen
            || gradient_stops
                .iter()
                .any(|stop| stop.depth() == ColorDepth::Sixteen)
        {
            ColorDepth::Sixteen
        } else {
            ColorDepth::Eight
        };

        Ok(Self {
            center_x,
            center_y,
            span_x,
            span_y,
            escape_radius,
            max_iterations,
            multiplier,
            space_color: space_color.to_depth(depth),
            gradient_stops: gradient_stops
                .into_iter()
                .map(|stop| stop.to_depth(depth))
                .collect(),
            depth,
        })
    }
}

/// The fractal type and window parsed from a fractal descriptor file.
#[derive(Debug, Clone, Copy)]
pub struct FractalDescriptor {
    pub kind: FractalKind,
    pub center_x: f64,
    pub center_y: f64,
    pub span_x: f64,
    pub span_y: f64,
    pub escape_radius: f64,
    pub max_iterations: u32,
}

impl FractalDescriptor {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        info!("reading fractal file {}", path.display());
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&text).map_err(|reason| ConfigError::Invalid {
            kind: "fractal",
            path: path.display().to_string(),
            reason,
        })
    }

    /// Parses the whitespace-separated token format
    /// `MANDELBROT|JULIA [cRe cIm] centerX centerY spanX spanY escapeRadius
    /// maxIter`; the `c` tokens are present for Julia sets only.
    fn parse(text: &str) -> Result<Self, String> {
        let mut tokens = Tokens::new(text);

        let kind = match tokens.next("fractal type")? {
            "MANDELBROT" => FractalKind::Mandelbrot,
            "JULIA" => FractalKind::Julia {
                c_re: tokens.real("Re(c)")?,
                c_im: tokens.real("Im(c)")?,
            },
            other => return Err(format!("unknown fractal type '{other}'")),
        };

        Ok(Self {
            kind,
            center_x: tokens.real("centerX")?,
            center_y: tokens.real("centerY")?,
            span_x: tokens.positive_real("spanX")?,
            span_y: tokens.positive_real("spanY")?,
            escape_radius: tokens.positive_real("escape radius")?,
            max_iterations: tokens.unsigned("maximum iteration count")?,
        })
    }

    pub fn into_fractal(self) -> Fractal {
        Fractal::from_center(
            self.kind,
            self.center_x,
            self.center_y,
            self.span_x,
            self.span_y,
            self.escape_radius,
            self.max_iterations,
        )
    }
}

/// Cursor over the whitespace-separated tokens of a file, producing errors
/// that name the offending field.
struct Tokens<'a> {
    iter: std::str::SplitWhitespace<'a>,
}

impl<'a> Tokens<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            iter: text.split_whitespace(),
        }
    }

    fn next(&mut self, name: &str) -> Result<&'a str, String> {
        self.iter.next().ok_or_else(|| format!("missing {name}"))
    }

    fn real(&mut self, name: &str) -> Result<f64, String> {
        let token = self.next(name)?;
        token
            .parse()
            .map_err(|_| format!("{name} must be a real number, got '{token}'"))
    }

    fn positive_real(&mut self, name: &str) -> Result<f64, String> {
        let value = self.real(name)?;
        if value > 0.0 {
            Ok(value)
        } else {
            Err(format!("{name} must be > 0, got {value}"))
        }
    }

    fn unsigned(&mut self, name: &str) -> Result<u32, String> {
        let token = self.next(name)?;
        token
            .parse()
            .map_err(|_| format!("{name} must be an unsigned integer, got '{token}'"))
    }

    /// Accepts 24-bit (up to six hex digits) and 48-bit colours, with an
    /// optional `0x` prefix.
    fn hex_color(&mut self, name: &str) -> Result<Color, String> {
        let token = self.next(name)?;
        let digits = token
            .strip_prefix("0x")
            .or_else(|| token.strip_prefix("0X"))
            .unwrap_or(token);

        let color = if digits.len() > 6 {
            u64::from_str_radix(digits, 16)
                .ok()
                .filter(|&packed| packed <= 0xffff_ffff_ffff)
                .map(Color::from_packed64)
        } else {
            u32::from_str_radix(digits, 16).ok().map(Color::from_packed32)
        };

        color.ok_or_else(|| format!("{name} must be a 24- or 48-bit hex colour, got '{token}'"))
    }
}
