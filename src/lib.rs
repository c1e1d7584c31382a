//! # hap_encoder
//!
//! Encoder for the Vidvox Hap family of video formats. A Hap frame stores GPU texture
//! compressed data, optionally split into chunks that are each passed through Snappy, wrapped
//! in nested length and type tagged sections.
//!
//! ## Supported formats
//!
//!  * Hap (DXT1)
//!  * Hap Alpha (DXT5)
//!  * Hap Q (scaled YCoCg DXT5)
//!  * Hap Alpha-Only (RGTC1)
//!  * Hap R (BC7)
//!  * Hap M (scaled YCoCg DXT5 plus a separate RGTC1 alpha texture)
//!
//! ## Example
//!
//! ```no_run
//! use hap_encoder::{Compressor, EncoderConfig, Frame, HapEncoder, PixelLayout, TextureFormat};
//!
//! let (width, height) = (256, 128);
//! let pixels = vec![0u8; (width * height * 4) as usize];
//!
//! let config = EncoderConfig::new(TextureFormat::HapAlpha)
//!     .with_chunk_count(4)
//!     .with_compressor(Compressor::Snappy);
//! let mut encoder = HapEncoder::new(config, width, height)?;
//!
//! let frame = Frame::packed(&pixels, width, height, PixelLayout::Rgba8);
//! let packet = encoder.encode_frame_to_vec(&frame)?;
//! # Ok::<(), hap_encoder::Error>(())
//! ```
mod chunk;
pub mod encode;
mod encoder;
mod error;
pub mod section;
mod settings;

use std::{fmt, str::FromStr};

pub use chunk::{
    Chunk, ChunkCompressionJob, ChunkCompressor, CompressResult, SecondStage, SnappyCompressor,
};
pub use encode::{BlockEncoder, Frame, TextureEncodingJob};
pub use encoder::{correct_chunk_count, HapEncoder, TextureLayout, TextureSizing};
pub use error::{Error, ErrorKind, Result};
pub use settings::EncoderConfig;

/// Upper bound for the number of second-stage chunks per texture.
pub const MAX_CHUNKS: usize = 64;

/// Width of a texture compression block in pixels.
pub const BLOCK_WIDTH: u32 = 4;

/// Height of a texture compression block in pixels.
pub const BLOCK_HEIGHT: u32 = 4;

/// Hap texture formats supported by this crate.
#[derive(Copy, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Debug)]
pub enum TextureFormat {
    /// DXT1 compression (RGB)
    Hap,
    /// DXT5 compression with smooth alpha (RGBA)
    HapAlpha,
    /// DXT5 compression of scaled YCoCg (RGB, higher quality)
    HapQ,
    /// RGTC1 compression of a single gray channel
    HapAlphaOnly,
    /// BC7 compression (RGBA)
    HapR,
    /// Scaled YCoCg DXT5 color texture followed by an RGTC1 alpha texture
    HapM,
}

impl TextureFormat {
    /// All formats, in option order.
    pub const ALL: [TextureFormat; 6] = [
        TextureFormat::Hap,
        TextureFormat::HapAlpha,
        TextureFormat::HapQ,
        TextureFormat::HapAlphaOnly,
        TextureFormat::HapR,
        TextureFormat::HapM,
    ];

    /// Number of textures stored per frame.
    pub const fn texture_count(self) -> usize {
        self.block_encoders().len()
    }

    /// Block encoders in the order their textures appear in a frame.
    pub const fn block_encoders(self) -> &'static [BlockEncoder] {
        match self {
            TextureFormat::Hap => &[BlockEncoder::Dxt1],
            TextureFormat::HapAlpha => &[BlockEncoder::Dxt5],
            TextureFormat::HapQ => &[BlockEncoder::YCoCgDxt5],
            TextureFormat::HapAlphaOnly => &[BlockEncoder::Rgtc1Gray],
            TextureFormat::HapR => &[BlockEncoder::Bc7],
            TextureFormat::HapM => &[BlockEncoder::YCoCgDxt5, BlockEncoder::Rgtc1Alpha],
        }
    }

    /// Four character code identifying the format in a container.
    pub const fn fourcc(self) -> [u8; 4] {
        match self {
            TextureFormat::Hap => *b"Hap1",
            TextureFormat::HapAlpha => *b"Hap5",
            TextureFormat::HapQ => *b"HapY",
            TextureFormat::HapAlphaOnly => *b"HapA",
            TextureFormat::HapR => *b"Hap7",
            TextureFormat::HapM => *b"HapM",
        }
    }

    /// Section type of the top level section.
    ///
    /// For single texture formats this is the texture format nibble, the compressor bits are
    /// added when the header is written.
    pub const fn section_type(self) -> u8 {
        match self {
            TextureFormat::Hap => BlockEncoder::Dxt1.section_type(),
            TextureFormat::HapAlpha => BlockEncoder::Dxt5.section_type(),
            TextureFormat::HapQ => BlockEncoder::YCoCgDxt5.section_type(),
            TextureFormat::HapAlphaOnly => BlockEncoder::Rgtc1Gray.section_type(),
            TextureFormat::HapR => BlockEncoder::Bc7.section_type(),
            TextureFormat::HapM => section::MULTIPLE_IMAGES,
        }
    }

    /// Pixel layout expected from source frames.
    pub const fn input_layout(self) -> PixelLayout {
        match self {
            TextureFormat::HapAlphaOnly => PixelLayout::Gray8,
            _ => PixelLayout::Rgba8,
        }
    }

    /// Option name of the format.
    pub const fn name(self) -> &'static str {
        match self {
            TextureFormat::Hap => "hap",
            TextureFormat::HapAlpha => "hap_alpha",
            TextureFormat::HapQ => "hap_q",
            TextureFormat::HapAlphaOnly => "hap_a",
            TextureFormat::HapR => "hap_r",
            TextureFormat::HapM => "hap_m",
        }
    }
}

impl FromStr for TextureFormat {
    type Err = Error;

    fn from_str(name: &str) -> Result<Self> {
        TextureFormat::ALL
            .into_iter()
            .find(|format| format.name().eq_ignore_ascii_case(name))
            .ok_or_else(|| Error::UnknownFormat(name.to_string()))
    }
}

impl fmt::Display for TextureFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Second-stage compressor applied on top of the texture compression.
#[derive(Copy, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Debug, Default)]
pub enum Compressor {
    /// Texture data is stored as is
    None,
    /// Texture data is compressed with Snappy
    #[default]
    Snappy,
}

impl Compressor {
    /// Compressor bits of a section type byte.
    pub const fn tag(self) -> u8 {
        match self {
            Compressor::None => 0xA0,
            Compressor::Snappy => 0xB0,
        }
    }

    /// Maps the upper nibble of a section type byte back to a compressor.
    pub const fn from_tag(tag: u8) -> Option<Self> {
        match tag & 0xF0 {
            0xA0 => Some(Compressor::None),
            0xB0 => Some(Compressor::Snappy),
            _ => None,
        }
    }

    /// Option name of the compressor.
    pub const fn name(self) -> &'static str {
        match self {
            Compressor::None => "none",
            Compressor::Snappy => "snappy",
        }
    }
}

impl FromStr for Compressor {
    type Err = Error;

    fn from_str(name: &str) -> Result<Self> {
        [Compressor::None, Compressor::Snappy]
            .into_iter()
            .find(|compressor| compressor.name().eq_ignore_ascii_case(name))
            .ok_or_else(|| Error::UnknownCompressor(name.to_string()))
    }
}

impl fmt::Display for Compressor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Memory layout of source pixels.
#[derive(Copy, Clone, Hash, Eq, PartialEq, Debug)]
pub enum PixelLayout {
    /// Four interleaved 8 bit channels, in RGBA order
    Rgba8,
    /// A single 8 bit gray channel
    Gray8,
}

impl PixelLayout {
    /// Bytes used by one pixel.
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            PixelLayout::Rgba8 => 4,
            PixelLayout::Gray8 => 1,
        }
    }
}
