//! Error types for Hap encoding and section parsing

use std::collections::TryReserveError;

use thiserror::Error;

use crate::section::HeaderLength;

/// Result type for Hap operations
pub type Result<T> = std::result::Result<T, Error>;

/// Broad classification of an [`Error`].
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum ErrorKind {
    /// Rejected encoder configuration, fatal at construction
    Configuration,
    /// Scratch memory could not be allocated
    Resource,
    /// A buffer or a section length field is too small for the data
    Capacity,
    /// The second-stage compressor failed although its worst-case bound was honoured
    Internal,
    /// A frame handed to the encoder does not match its configuration
    InvalidInput,
    /// Malformed Hap sections
    InvalidData,
}

/// Hap error types
#[derive(Error, Debug)]
pub enum Error {
    /// Unknown texture format name or identifier
    #[error("Unknown texture format: {0}")]
    UnknownFormat(String),

    /// Unknown second-stage compressor name or identifier
    #[error("Unknown second-stage compressor: {0}")]
    UnknownCompressor(String),

    /// Frame dimensions the encoder cannot work with
    #[error("Invalid frame size {width}x{height}: must be a non-zero multiple of 4")]
    InvalidDimensions { width: u32, height: u32 },

    /// A chunk exceeds what the second-stage compressor can bound
    #[error("Chunk of {0} bytes is too large for the second-stage compressor")]
    ChunkTooLarge(usize),

    /// Scratch buffer allocation failed
    #[error("Failed to allocate {size} bytes of scratch memory")]
    Allocation {
        size: usize,
        #[source]
        source: TryReserveError,
    },

    /// Output buffer can't hold the worst-case frame
    #[error("Output buffer too small: needed {needed} bytes, got {available}")]
    BufferTooSmall { needed: usize, available: usize },

    /// Section length doesn't fit the header's length field
    #[error("Section of {length} bytes does not fit a {header:?} header")]
    SectionTooLarge { length: usize, header: HeaderLength },

    /// Texture size isn't a multiple of the chunk count
    #[error("Texture of {texture_size} bytes can't be split into {chunk_count} equal chunks")]
    UnevenChunks {
        texture_size: usize,
        chunk_count: usize,
    },

    /// Second-stage compressor reported a failure
    #[error("Second-stage compression of chunk {chunk} failed: {source}")]
    SecondStage {
        chunk: usize,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Frame dimensions differ from the encoder's
    #[error("Frame is {width}x{height}, encoder expects {expected_width}x{expected_height}")]
    FrameSizeMismatch {
        width: u32,
        height: u32,
        expected_width: u32,
        expected_height: u32,
    },

    /// Frame pixel layout differs from what the texture format consumes
    #[error("Frame layout {actual:?} can't be encoded, expected {expected:?}")]
    FrameLayoutMismatch {
        expected: crate::PixelLayout,
        actual: crate::PixelLayout,
    },

    /// Frame stride is shorter than a row of pixels
    #[error("Frame stride {stride} is shorter than a row of {row_bytes} bytes")]
    InvalidStride { stride: usize, row_bytes: usize },

    /// Frame data ends before the last row
    #[error("Frame data too small: expected at least {expected} bytes, got {actual}")]
    FrameTooSmall { expected: usize, actual: usize },

    /// Truncated section data
    #[error("Truncated section: expected {expected} bytes, got {actual}")]
    TruncatedSection { expected: usize, actual: usize },

    /// A section of an unexpected type was found
    #[error("Unexpected section type {found:#04x}, expected {expected:#04x}")]
    UnexpectedSection { expected: u8, found: u8 },

    /// Structurally invalid section content
    #[error("Invalid section: {0}")]
    InvalidSection(String),
}

impl Error {
    /// Classifies the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::UnknownFormat(_)
            | Error::UnknownCompressor(_)
            | Error::InvalidDimensions { .. }
            | Error::ChunkTooLarge(_) => ErrorKind::Configuration,
            Error::Allocation { .. } => ErrorKind::Resource,
            Error::BufferTooSmall { .. } | Error::SectionTooLarge { .. } => ErrorKind::Capacity,
            Error::UnevenChunks { .. } | Error::SecondStage { .. } => ErrorKind::Internal,
            Error::FrameSizeMismatch { .. }
            | Error::FrameLayoutMismatch { .. }
            | Error::InvalidStride { .. }
            | Error::FrameTooSmall { .. } => ErrorKind::InvalidInput,
            Error::TruncatedSection { .. }
            | Error::UnexpectedSection { .. }
            | Error::InvalidSection(_) => ErrorKind::InvalidData,
        }
    }
}
