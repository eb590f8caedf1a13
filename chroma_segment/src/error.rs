// THEORY:
// Every failure the engine can report is local, synchronous and detectable at the
// call site. None of them require retries and none are fatal to the process: a
// `NotReady` or `NoTemplates` simply means "classification unavailable this frame".
// They are gathered into one enum so callers can match on them with `?` plumbing
// instead of decoding sentinel values.

use crate::core_modules::template_store::TemplateClass;
use thiserror::Error;

/// Errors raised by the segmentation engine.
#[derive(Debug, Error)]
pub enum SegmentError {
    /// A distance was requested between distributions that are not both finalized.
    #[error("distribution is not finalized")]
    NotReady,

    /// A nearest-template query ran against an empty template collection.
    #[error("no {0} templates have been captured")]
    NoTemplates(TemplateClass),

    /// A distribution was finalized without a single accumulated sample.
    #[error("cannot finalize a distribution built from an empty region")]
    EmptyRegion,

    #[error("region ({x0},{y0})..({x1},{y1}) does not fit in a {width}x{height} frame")]
    RegionOutOfBounds {
        x0: u32,
        y0: u32,
        x1: u32,
        y1: u32,
        width: u32,
        height: u32,
    },

    #[error("block size must be positive, got {0}")]
    InvalidBlockSize(u32),

    #[error("frames differ in size: {left_width}x{left_height} vs {right_width}x{right_height}")]
    FrameSizeMismatch {
        left_width: u32,
        left_height: u32,
        right_width: u32,
        right_height: u32,
    },

    #[error(transparent)]
    Image(#[from] image::ImageError),

    #[error("{0}")]
    WorkerPool(&'static str),
}

pub type Result<T> = std::result::Result<T, SegmentError>;
