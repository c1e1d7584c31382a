//! Second-stage chunk compression
//!
//! A compressed texture is split into equally sized chunks that are compressed independently,
//! so decoders can decompress them in parallel. A chunk that doesn't shrink is stored as is.

use tracing::trace;

use crate::{Compressor, Error, Result, MAX_CHUNKS};

/// Result of a single second-stage compression call.
pub type CompressResult = std::result::Result<usize, Box<dyn std::error::Error + Send + Sync>>;

/// General-purpose byte compressor applied to chunks.
pub trait SecondStage {
    /// Compressor recorded for chunks that shrank.
    fn compressor(&self) -> Compressor;

    /// Worst-case output size for an input of `input_len` bytes, `0` if the input is too large.
    fn max_compressed_len(&self, input_len: usize) -> usize;

    /// Compresses `input` into `output` and returns the number of bytes written.
    ///
    /// `output` holds at least [`Self::max_compressed_len`] bytes.
    fn compress(&mut self, input: &[u8], output: &mut [u8]) -> CompressResult;
}

/// Snappy in its raw (unframed) format.
pub struct SnappyCompressor {
    encoder: snap::raw::Encoder,
}

impl SnappyCompressor {
    pub fn new() -> Self {
        Self {
            encoder: snap::raw::Encoder::new(),
        }
    }
}

impl Default for SnappyCompressor {
    fn default() -> Self {
        Self::new()
    }
}

impl SecondStage for SnappyCompressor {
    fn compressor(&self) -> Compressor {
        Compressor::Snappy
    }

    fn max_compressed_len(&self, input_len: usize) -> usize {
        snap::raw::max_compress_len(input_len)
    }

    fn compress(&mut self, input: &[u8], output: &mut [u8]) -> CompressResult {
        Ok(self.encoder.compress(input, output)?)
    }
}

/// One chunk of a texture.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Chunk {
    /// Compressor the stored bytes need
    pub compressor: Compressor,
    /// Position within the compressed texture
    pub uncompressed_offset: usize,
    /// Size within the compressed texture
    pub uncompressed_size: usize,
    /// Position within the chunk payload
    pub compressed_offset: usize,
    /// Size within the chunk payload
    pub compressed_size: usize,
}

/// Input of one [`ChunkCompressor::compress`] call.
#[derive(Copy, Clone, Debug)]
pub struct ChunkCompressionJob<'a> {
    /// Compressed texture to split
    pub texture: &'a [u8],
    /// Number of chunks, must divide the texture size
    pub chunk_count: usize,
    /// Worst-case second-stage output of one chunk
    pub max_chunk_len: usize,
}

impl ChunkCompressionJob<'_> {
    /// Bytes of the destination one chunk may use.
    pub fn slot_len(&self) -> usize {
        self.max_chunk_len.max(self.texture.len() / self.chunk_count.max(1))
    }

    /// Destination size needed for the worst case.
    pub fn max_payload_len(&self) -> usize {
        self.slot_len() * self.chunk_count
    }
}

/// Splits textures into chunks and compresses them, keeping the chunk table of the last call.
pub struct ChunkCompressor<S> {
    second_stage: S,
    chunks: Vec<Chunk>,
}

impl<S: SecondStage> ChunkCompressor<S> {
    pub fn new(second_stage: S) -> Self {
        Self {
            second_stage,
            chunks: Vec::with_capacity(MAX_CHUNKS),
        }
    }

    /// Chunk table of the most recent texture.
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// Worst-case output of the wrapped compressor.
    pub fn max_compressed_len(&self, input_len: usize) -> usize {
        self.second_stage.max_compressed_len(input_len)
    }

    /// Records a texture that was written without second-stage compression as a single chunk.
    pub fn store_uncompressed(&mut self, texture_size: usize) {
        self.chunks.clear();
        self.chunks.push(Chunk {
            compressor: Compressor::None,
            uncompressed_offset: 0,
            uncompressed_size: texture_size,
            compressed_offset: 0,
            compressed_size: texture_size,
        });
    }

    /// Compresses every chunk of the job into `destination`, back to back in index order.
    ///
    /// Returns the payload size, the sum of all compressed chunk sizes.
    pub fn compress(&mut self, job: &ChunkCompressionJob, destination: &mut [u8]) -> Result<usize> {
        let texture_size = job.texture.len();

        if job.chunk_count == 0 || job.chunk_count > MAX_CHUNKS || texture_size % job.chunk_count != 0
        {
            return Err(Error::UnevenChunks {
                texture_size,
                chunk_count: job.chunk_count,
            });
        }

        let needed = job.max_payload_len();
        if destination.len() < needed {
            return Err(Error::BufferTooSmall {
                needed,
                available: destination.len(),
            });
        }

        let uncompressed_size = texture_size / job.chunk_count;
        let slot_len = job.slot_len();
        let mut compressed_offset = 0;

        self.chunks.clear();

        for (index, source) in job.texture.chunks_exact(uncompressed_size).enumerate() {
            let output = &mut destination[compressed_offset..compressed_offset + slot_len];

            let written = self
                .second_stage
                .compress(source, output)
                .map_err(|source| Error::SecondStage {
                    chunk: index,
                    source,
                })?;

            let (compressor, compressed_size) = if written >= uncompressed_size {
                trace!(
                    "Chunk {index} grew to {written} bytes from {uncompressed_size}, storing raw"
                );
                output[..uncompressed_size].copy_from_slice(source);
                (Compressor::None, uncompressed_size)
            } else {
                (self.second_stage.compressor(), written)
            };

            self.chunks.push(Chunk {
                compressor,
                uncompressed_offset: index * uncompressed_size,
                uncompressed_size,
                compressed_offset,
                compressed_size,
            });

            compressed_offset += compressed_size;
        }

        Ok(compressed_offset)
    }
}
