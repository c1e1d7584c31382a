use crate::{Compressor, TextureFormat};

/// Encoder configuration, fixed for the lifetime of a [`crate::HapEncoder`].
///
/// The requested chunk count is a wish: the encoder clamps it to `1..=MAX_CHUNKS` and lowers
/// it until it divides the frame's block count. Without a second-stage compressor a single
/// chunk is always used.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct EncoderConfig {
    pub(crate) format: TextureFormat,
    pub(crate) chunk_count: usize,
    pub(crate) compressor: Compressor,
    pub(crate) threads: Option<usize>,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self::new(TextureFormat::Hap)
    }
}

impl EncoderConfig {
    /// Single chunk, Snappy compressed frames of the given format.
    pub const fn new(format: TextureFormat) -> Self {
        Self {
            format,
            chunk_count: 1,
            compressor: Compressor::Snappy,
            threads: None,
        }
    }

    /// Sets the requested number of second-stage chunks per texture.
    pub const fn with_chunk_count(mut self, chunk_count: usize) -> Self {
        self.chunk_count = chunk_count;
        self
    }

    /// Sets the second-stage compressor.
    pub const fn with_compressor(mut self, compressor: Compressor) -> Self {
        self.compressor = compressor;
        self
    }

    /// Limits the number of slices block compression is split into.
    ///
    /// Defaults to the size of the rayon thread pool.
    pub const fn with_threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads);
        self
    }

    /// Builds a configuration from option names, e.g. `"hap_q"` and `"snappy"`.
    pub fn from_names(format: &str, chunk_count: usize, compressor: &str) -> crate::Result<Self> {
        Ok(Self::new(format.parse()?)
            .with_chunk_count(chunk_count)
            .with_compressor(compressor.parse()?))
    }

    /// Requested texture format.
    pub const fn format(&self) -> TextureFormat {
        self.format
    }

    /// Requested chunk count, before correction.
    pub const fn chunk_count(&self) -> usize {
        self.chunk_count
    }

    /// Requested second-stage compressor.
    pub const fn compressor(&self) -> Compressor {
        self.compressor
    }

    /// Requested slice limit, if any.
    pub const fn threads(&self) -> Option<usize> {
        self.threads
    }
}
