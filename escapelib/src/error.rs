/// Errors produced by the rendering pipeline.
///
/// All of them are fatal: the pipeline never retries, and callers are
/// expected to surface the message and stop.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("cannot cut a {width}x{height} rectangle into {parts} parts")]
    TooManyParts { width: u32, height: u32, parts: u32 },

    #[error("the value grid must be at least 2x2, got {width}x{height}")]
    GridTooSmall { width: u32, height: u32 },

    #[error("filter sigma must be > 0, got {0}")]
    InvalidSigma(f64),

    #[error("filter radius must be > 0, got {0}")]
    InvalidRadius(f64),

    #[error("a gradient needs at least two stop colours, got {0}")]
    NotEnoughStops(usize),

    #[error("a gradient needs at least two samples per transition, got {0}")]
    NotEnoughSamples(u32),

    #[error("expected a {expected_width}x{expected_height} buffer, got {width}x{height}")]
    DimensionMismatch {
        expected_width: u32,
        expected_height: u32,
        width: u32,
        height: u32,
    },

    #[error("cannot downscale a {src_width}x{src_height} image to a larger {dst_width}x{dst_height} one")]
    UpscaleNotSupported {
        src_width: u32,
        src_height: u32,
        dst_width: u32,
        dst_height: u32,
    },

    #[error("the image is empty")]
    EmptyImage,

    #[error("oversampling factor must be > 1, got {0}")]
    InvalidOversamplingFactor(f64),

    #[error("a render worker failed: {0}")]
    WorkerFailure(Box<Error>),
}
