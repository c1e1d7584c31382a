//! Frame encoding: setup of the texture layout and scratch memory, then per frame block
//! compression, chunk compression and section headers.

use std::fmt;

use tracing::{debug, info};

use crate::{
    encode::{BlockEncoder, Frame, TextureEncodingJob},
    section::{self, HeaderLength, SectionWriter, SHORT_HEADER_LEN},
    Chunk, ChunkCompressionJob, ChunkCompressor, Compressor, EncoderConfig, Error, Result,
    SnappyCompressor, BLOCK_HEIGHT, BLOCK_WIDTH, MAX_CHUNKS,
};

/// Chunk count actually used for a frame of `block_count` blocks.
///
/// Without a second-stage compressor this is always one. Otherwise the request is clamped to
/// `1..=MAX_CHUNKS` and lowered until it divides the block count.
pub fn correct_chunk_count(requested: usize, block_count: usize, compressor: Compressor) -> usize {
    if compressor == Compressor::None {
        return 1;
    }

    let mut chunk_count = requested.clamp(1, MAX_CHUNKS);
    while block_count % chunk_count != 0 {
        chunk_count -= 1;
    }
    chunk_count
}

/// Sizes of one texture of a frame.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct TextureSizing {
    /// Block compressor of the texture
    pub encoder: BlockEncoder,
    /// Size of the block compressed texture
    pub texture_size: usize,
    /// Worst-case stored size of one chunk
    pub max_chunk_len: usize,
}

impl TextureSizing {
    /// Worst-case size of the chunk payload.
    pub fn max_payload_len(&self, chunk_count: usize) -> usize {
        self.max_chunk_len.max(self.texture_size / chunk_count) * chunk_count
    }
}

/// Geometry and sizes derived once from the configuration and frame size.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TextureLayout {
    /// Blocks per row
    pub blocks_x: usize,
    /// Block rows
    pub blocks_y: usize,
    /// Corrected chunk count, shared by all textures
    pub chunk_count: usize,
    /// Number of block row slices compressed in parallel
    pub slice_count: usize,
    /// Textures in frame order
    pub textures: Vec<TextureSizing>,
}

impl TextureLayout {
    /// Blocks per texture.
    pub fn block_count(&self) -> usize {
        self.blocks_x * self.blocks_y
    }

    /// Header kind of the texture sections.
    fn texture_header(&self) -> HeaderLength {
        match self.textures.len() {
            1 => HeaderLength::Long,
            _ => HeaderLength::Short,
        }
    }

    /// Worst-case size of an encoded frame.
    pub fn max_frame_size(&self) -> usize {
        let header = self.texture_header();
        let sections = self
            .textures
            .iter()
            .map(|texture| {
                section::texture_header_len(self.chunk_count, header)
                    + texture.max_payload_len(self.chunk_count)
            })
            .sum::<usize>();

        match header {
            HeaderLength::Long => sections,
            HeaderLength::Short => SHORT_HEADER_LEN + sections,
        }
    }
}

/// Encodes frames of one size into Hap frames.
///
/// Scratch memory is allocated once by [`HapEncoder::new`] and reused for every frame.
pub struct HapEncoder {
    config: EncoderConfig,
    width: u32,
    height: u32,
    layout: TextureLayout,
    /// Block compressed textures awaiting chunk compression, one per texture
    scratch: Vec<Vec<u8>>,
    chunk_compressor: ChunkCompressor<SnappyCompressor>,
}

impl fmt::Debug for HapEncoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HapEncoder")
            .field("config", &self.config)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("layout", &self.layout)
            .finish_non_exhaustive()
    }
}

impl HapEncoder {
    /// Sets up an encoder for frames of `width` x `height` pixels.
    ///
    /// Both dimensions must be non-zero multiples of 4. All scratch memory is allocated here.
    pub fn new(config: EncoderConfig, width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 || width % BLOCK_WIDTH != 0 || height % BLOCK_HEIGHT != 0 {
            return Err(Error::InvalidDimensions { width, height });
        }

        let blocks_x = (width / BLOCK_WIDTH) as usize;
        let blocks_y = (height / BLOCK_HEIGHT) as usize;
        let block_count = blocks_x * blocks_y;

        let chunk_count = correct_chunk_count(config.chunk_count, block_count, config.compressor);
        if chunk_count != config.chunk_count {
            info!(
                "Using {chunk_count} chunks instead of the requested {} for {block_count} blocks",
                config.chunk_count
            );
        }

        let chunk_compressor = ChunkCompressor::new(SnappyCompressor::new());

        let textures = config
            .format
            .block_encoders()
            .iter()
            .map(|&encoder| {
                let texture_size = block_count * encoder.block_byte_size();
                let chunk_size = texture_size / chunk_count;

                let max_chunk_len = match config.compressor {
                    Compressor::None => chunk_size,
                    Compressor::Snappy => match chunk_compressor.max_compressed_len(chunk_size) {
                        0 => return Err(Error::ChunkTooLarge(chunk_size)),
                        len => len,
                    },
                };

                Ok(TextureSizing {
                    encoder,
                    texture_size,
                    max_chunk_len,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let slice_count = config.threads.unwrap_or_else(pool_size).clamp(1, blocks_y);

        let scratch = match config.compressor {
            Compressor::None => Vec::new(),
            Compressor::Snappy => textures
                .iter()
                .map(|texture| allocate(texture.texture_size))
                .collect::<Result<Vec<_>>>()?,
        };

        let layout = TextureLayout {
            blocks_x,
            blocks_y,
            chunk_count,
            slice_count,
            textures,
        };

        debug!(
            "{} encoder for {width}x{height}: {chunk_count} chunks, {slice_count} slices, {} bytes max",
            config.format,
            layout.max_frame_size()
        );

        Ok(Self {
            config,
            width,
            height,
            layout,
            scratch,
            chunk_compressor,
        })
    }

    /// Configuration as requested.
    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }

    /// Derived sizes, including the corrected chunk count.
    pub fn layout(&self) -> &TextureLayout {
        &self.layout
    }

    /// Frame width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Frame height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Corrected chunk count.
    pub fn chunk_count(&self) -> usize {
        self.layout.chunk_count
    }

    /// Four character code of the configured format.
    pub fn fourcc(&self) -> [u8; 4] {
        self.config.format.fourcc()
    }

    /// Chunk table of the most recently encoded texture.
    pub fn chunks(&self) -> &[Chunk] {
        self.chunk_compressor.chunks()
    }

    /// Output size [`HapEncoder::encode_frame`] needs.
    pub fn max_frame_size(&self) -> usize {
        self.layout.max_frame_size()
    }

    /// Encodes `frame` into the start of `output` and returns the frame size.
    ///
    /// `output` must hold at least [`HapEncoder::max_frame_size`] bytes. On error the content
    /// of `output` is unspecified.
    pub fn encode_frame(&mut self, frame: &Frame, output: &mut [u8]) -> Result<usize> {
        frame.validate(self.width, self.height, self.config.format.input_layout())?;

        let needed = self.max_frame_size();
        if output.len() < needed {
            return Err(Error::BufferTooSmall {
                needed,
                available: output.len(),
            });
        }

        let size = match self.layout.texture_header() {
            HeaderLength::Long => self.encode_texture(0, frame, HeaderLength::Long, output)?,
            HeaderLength::Short => {
                let mut size = SHORT_HEADER_LEN;
                for index in 0..self.layout.textures.len() {
                    size +=
                        self.encode_texture(index, frame, HeaderLength::Short, &mut output[size..])?;
                }

                SectionWriter::new(output).write_header(
                    HeaderLength::Short,
                    size - SHORT_HEADER_LEN,
                    self.config.format.section_type(),
                )?;
                size
            }
        };

        debug!("Encoded {} frame of {size} bytes", self.config.format);

        Ok(size)
    }

    /// Encodes `frame` into a new buffer of the exact frame size.
    pub fn encode_frame_to_vec(&mut self, frame: &Frame) -> Result<Vec<u8>> {
        let mut output = allocate(self.max_frame_size())?;
        let size = self.encode_frame(frame, &mut output)?;
        output.truncate(size);
        Ok(output)
    }

    /// Writes the complete section of texture `index` to the start of `output`, returns its size.
    fn encode_texture(
        &mut self,
        index: usize,
        frame: &Frame,
        header: HeaderLength,
        output: &mut [u8],
    ) -> Result<usize> {
        let sizing = self.layout.textures[index];
        let chunk_count = self.layout.chunk_count;
        let header_len = section::texture_header_len(chunk_count, header);

        let (header_bytes, payload) = output.split_at_mut(header_len);
        let job = TextureEncodingJob::new(*frame, sizing.encoder, self.layout.slice_count);

        let payload_len = match self.config.compressor {
            Compressor::None => {
                let length = header_len - header.size() + sizing.texture_size;
                if length > header.max_section_len() {
                    return Err(Error::SectionTooLarge { length, header });
                }

                job.execute(payload)?;
                self.chunk_compressor.store_uncompressed(sizing.texture_size);
                sizing.texture_size
            }
            Compressor::Snappy => {
                job.execute(&mut self.scratch[index])?;

                let chunk_job = ChunkCompressionJob {
                    texture: self.scratch[index].as_slice(),
                    chunk_count,
                    max_chunk_len: sizing.max_chunk_len,
                };
                self.chunk_compressor.compress(&chunk_job, payload)?
            }
        };

        section::write_texture_header(
            header_bytes,
            header,
            sizing.encoder.section_type(),
            self.chunk_compressor.chunks(),
            payload_len,
        )?;

        Ok(header_len + payload_len)
    }
}

#[cfg(feature = "rayon")]
fn pool_size() -> usize {
    rayon::current_num_threads()
}

#[cfg(not(feature = "rayon"))]
fn pool_size() -> usize {
    1
}

fn allocate(size: usize) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    buffer
        .try_reserve_exact(size)
        .map_err(|source| Error::Allocation { size, source })?;
    buffer.resize(size, 0);
    Ok(buffer)
}
