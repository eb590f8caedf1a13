// THEORY:
// This file is the main entry point for the `chroma_segment` library crate.
//
// The engine segments video frames into "background" and "object" by color
// composition. Sample regions of each class are turned into color-histogram
// fingerprints during calibration; afterwards every block of a frame is labeled with
// the class whose closest fingerprint is nearer.
//
// `pipeline::SegmentationPipeline` is the high-level, single-threaded interface and
// `parallel_pipeline::ParallelPipeline` its tokio-backed counterpart. `session` wraps a
// pipeline in the interactive calibration workflow. The building blocks in
// `core_modules` stay public for callers that want to compose them directly.

pub mod core_modules;
pub mod error;
pub mod parallel_pipeline;
pub mod pipeline;
pub mod session;

pub use error::{Result, SegmentError};
