//! Live-frame face detection and classification pipeline.
//!
//! A raw camera frame flows through conversion, asynchronous face
//! detection, square cropping and per-crop label classification into one
//! combined per-frame result, with the latest crops exposed for display.

pub mod classification;
pub mod detection;
pub mod ingest;
pub mod overlay;
pub mod pipeline;
pub mod shared;
