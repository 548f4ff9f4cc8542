//! Stream decoding: line framing, envelope adapters and the delta decoder.

pub mod decoder;
pub mod envelope;
pub mod frames;

pub use decoder::{DeltaSink, StreamDecoder};
pub use envelope::{extract_delta, EXTRACTORS};
pub use frames::FrameReader;
