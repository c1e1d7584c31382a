//! Texture compression of whole frames.
//!
//! A [`TextureEncodingJob`] splits the block grid of a frame into horizontal slices of block
//! rows. Every slice owns a disjoint part of the destination, so slices are compressed in
//! parallel when the `rayon` feature is enabled. [`TextureEncodingJob::execute`] returns once
//! all slices are done.

mod block;

#[cfg(feature = "rayon")]
use rayon::prelude::*;
use tracing::trace;

pub use self::block::BlockEncoder;
use crate::{Error, PixelLayout, Result, BLOCK_HEIGHT, BLOCK_WIDTH};

/// A borrowed source frame.
#[derive(Copy, Clone, Debug)]
pub struct Frame<'a> {
    /// Pixel data, rows are `stride` bytes apart
    pub data: &'a [u8],
    /// Distance between the starts of two pixel rows in bytes
    pub stride: usize,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Layout of a single pixel
    pub layout: PixelLayout,
}

impl<'a> Frame<'a> {
    /// A frame whose rows start `stride` bytes apart.
    pub const fn new(
        data: &'a [u8],
        stride: usize,
        width: u32,
        height: u32,
        layout: PixelLayout,
    ) -> Self {
        Self {
            data,
            stride,
            width,
            height,
            layout,
        }
    }

    /// A frame without padding between rows.
    pub const fn packed(data: &'a [u8], width: u32, height: u32, layout: PixelLayout) -> Self {
        Self::new(
            data,
            width as usize * layout.bytes_per_pixel(),
            width,
            height,
            layout,
        )
    }

    pub(crate) fn validate(&self, width: u32, height: u32, layout: PixelLayout) -> Result<()> {
        if (self.width, self.height) != (width, height) {
            return Err(Error::FrameSizeMismatch {
                width: self.width,
                height: self.height,
                expected_width: width,
                expected_height: height,
            });
        }

        if self.layout != layout {
            return Err(Error::FrameLayoutMismatch {
                expected: layout,
                actual: self.layout,
            });
        }

        self.check_bounds()
    }

    fn check_bounds(&self) -> Result<()> {
        let row_bytes = self.width as usize * self.layout.bytes_per_pixel();

        if self.stride < row_bytes {
            return Err(Error::InvalidStride {
                stride: self.stride,
                row_bytes,
            });
        }

        let expected = (self.height as usize)
            .saturating_sub(1)
            .checked_mul(self.stride)
            .and_then(|rows| rows.checked_add(row_bytes))
            .unwrap_or(usize::MAX);
        if self.data.len() < expected {
            return Err(Error::FrameTooSmall {
                expected,
                actual: self.data.len(),
            });
        }

        Ok(())
    }
}

/// One texture compression pass over a frame.
#[derive(Copy, Clone, Debug)]
pub struct TextureEncodingJob<'a> {
    /// Source pixels
    pub frame: Frame<'a>,
    /// Block compressor applied to every block
    pub encoder: BlockEncoder,
    /// Number of slices the block rows are split into
    pub slice_count: usize,
}

impl<'a> TextureEncodingJob<'a> {
    /// A job compressing `frame` with `encoder`, split into at most `slice_count` slices.
    pub const fn new(frame: Frame<'a>, encoder: BlockEncoder, slice_count: usize) -> Self {
        Self {
            frame,
            encoder,
            slice_count,
        }
    }

    /// Blocks per row.
    pub const fn block_columns(&self) -> usize {
        (self.frame.width / BLOCK_WIDTH) as usize
    }

    /// Rows of blocks.
    pub const fn block_rows(&self) -> usize {
        (self.frame.height / BLOCK_HEIGHT) as usize
    }

    /// Size of the compressed texture in bytes.
    pub const fn compressed_size(&self) -> usize {
        self.block_columns() * self.block_rows() * self.encoder.block_byte_size()
    }

    /// Compresses all blocks of the frame into the start of `destination`, in raster order.
    pub fn execute(&self, destination: &mut [u8]) -> Result<()> {
        let Frame { width, height, .. } = self.frame;

        if width == 0 || height == 0 || width % BLOCK_WIDTH != 0 || height % BLOCK_HEIGHT != 0 {
            return Err(Error::InvalidDimensions { width, height });
        }

        if self.frame.layout != self.encoder.input_layout() {
            return Err(Error::FrameLayoutMismatch {
                expected: self.encoder.input_layout(),
                actual: self.frame.layout,
            });
        }

        self.frame.check_bounds()?;

        let size = self.compressed_size();
        if destination.len() < size {
            return Err(Error::BufferTooSmall {
                needed: size,
                available: destination.len(),
            });
        }

        let block_rows = self.block_rows();
        let slice_count = self.slice_count.clamp(1, block_rows);
        let rows_per_slice = block_rows.div_ceil(slice_count);
        let slice_bytes = rows_per_slice * self.block_columns() * self.encoder.block_byte_size();

        trace!(
            "Compressing {width}x{height} frame with {:?} in {slice_count} slices",
            self.encoder
        );

        let destination = &mut destination[..size];

        #[cfg(feature = "rayon")]
        destination
            .par_chunks_mut(slice_bytes)
            .enumerate()
            .for_each(|(index, slice)| self.compress_slice(index * rows_per_slice, slice));

        #[cfg(not(feature = "rayon"))]
        destination
            .chunks_mut(slice_bytes)
            .enumerate()
            .for_each(|(index, slice)| self.compress_slice(index * rows_per_slice, slice));

        Ok(())
    }

    fn compress_slice(&self, first_row: usize, destination: &mut [u8]) {
        let bytes_per_pixel = self.frame.layout.bytes_per_pixel();
        let block_size = self.encoder.block_byte_size();
        let row_bytes = self.block_columns() * block_size;
        let stride = self.frame.stride;

        for (row_index, row) in destination.chunks_exact_mut(row_bytes).enumerate() {
            let row_offset = (first_row + row_index) * BLOCK_HEIGHT as usize * stride;

            for (column, block) in row.chunks_exact_mut(block_size).enumerate() {
                let offset = row_offset + column * BLOCK_WIDTH as usize * bytes_per_pixel;
                self.encoder
                    .encode_block(&self.frame.data[offset..], stride, block);
            }
        }
    }
}
