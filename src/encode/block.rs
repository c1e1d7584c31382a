use block_compression::{encode::compress_rgba8, BC7Settings, CompressionVariant};

use crate::{PixelLayout, BLOCK_HEIGHT, BLOCK_WIDTH};

const BLOCK_PIXELS: usize = (BLOCK_WIDTH * BLOCK_HEIGHT) as usize;
const ROW_BYTES: usize = BLOCK_WIDTH as usize * 4;

/// One 4x4 block of interleaved RGBA8 pixels.
type RgbaBlock = [u8; BLOCK_PIXELS * 4];

/// Block compressor used for one texture of a frame.
#[derive(Copy, Clone, Hash, Eq, PartialEq, Debug)]
pub enum BlockEncoder {
    /// DXT1 / BC1 of the RGB channels
    Dxt1,
    /// DXT5 / BC3 of the RGBA channels
    Dxt5,
    /// DXT5 / BC3 of scaled YCoCg, with luma in the alpha channel
    YCoCgDxt5,
    /// RGTC1 / BC4 of a gray channel
    Rgtc1Gray,
    /// RGTC1 / BC4 of the alpha channel of RGBA pixels
    Rgtc1Alpha,
    /// BPTC / BC7 of the RGBA channels
    Bc7,
}

impl BlockEncoder {
    /// Bytes of one compressed block.
    pub const fn block_byte_size(self) -> usize {
        match self {
            BlockEncoder::Dxt1 | BlockEncoder::Rgtc1Gray | BlockEncoder::Rgtc1Alpha => 8,
            BlockEncoder::Dxt5 | BlockEncoder::YCoCgDxt5 | BlockEncoder::Bc7 => 16,
        }
    }

    /// Texture format nibble written into a texture's section type.
    pub const fn section_type(self) -> u8 {
        match self {
            BlockEncoder::Dxt1 => 0x0B,
            BlockEncoder::Dxt5 => 0x0E,
            BlockEncoder::YCoCgDxt5 => 0x0F,
            BlockEncoder::Rgtc1Gray | BlockEncoder::Rgtc1Alpha => 0x01,
            BlockEncoder::Bc7 => 0x0C,
        }
    }

    /// Pixel layout the encoder reads.
    pub const fn input_layout(self) -> PixelLayout {
        match self {
            BlockEncoder::Rgtc1Gray => PixelLayout::Gray8,
            _ => PixelLayout::Rgba8,
        }
    }

    /// Compresses the block whose top left pixel starts `source`.
    ///
    /// `stride` is the distance between pixel rows in bytes and `destination` must hold
    /// [`Self::block_byte_size`] bytes.
    pub fn encode_block(self, source: &[u8], stride: usize, destination: &mut [u8]) {
        let mut block = match self {
            BlockEncoder::Rgtc1Gray => load_gray(source, stride),
            BlockEncoder::Rgtc1Alpha => load_alpha(source, stride),
            _ => load_rgba(source, stride),
        };

        if self == BlockEncoder::YCoCgDxt5 {
            rgba_to_scaled_ycocg(&mut block);
        }

        compress_rgba8(
            self.variant(),
            &block,
            destination,
            BLOCK_WIDTH,
            BLOCK_HEIGHT,
            ROW_BYTES as u32,
        );
    }

    fn variant(self) -> CompressionVariant {
        match self {
            BlockEncoder::Dxt1 => CompressionVariant::BC1,
            BlockEncoder::Dxt5 | BlockEncoder::YCoCgDxt5 => CompressionVariant::BC3,
            BlockEncoder::Rgtc1Gray | BlockEncoder::Rgtc1Alpha => CompressionVariant::BC4,
            BlockEncoder::Bc7 => CompressionVariant::BC7(BC7Settings::alpha_basic()),
        }
    }
}

fn load_rgba(source: &[u8], stride: usize) -> RgbaBlock {
    let mut block = [0; BLOCK_PIXELS * 4];

    for (y, row) in block.chunks_exact_mut(ROW_BYTES).enumerate() {
        let offset = y * stride;
        row.copy_from_slice(&source[offset..offset + ROW_BYTES]);
    }

    block
}

/// BC4 reads the red channel only.
fn load_gray(source: &[u8], stride: usize) -> RgbaBlock {
    let mut block = [0; BLOCK_PIXELS * 4];
    let pixels: &mut [[u8; 4]] = bytemuck::cast_slice_mut(&mut block[..]);

    for (index, pixel) in pixels.iter_mut().enumerate() {
        let value = source[(index / 4) * stride + index % 4];
        *pixel = [value, value, value, u8::MAX];
    }

    block
}

fn load_alpha(source: &[u8], stride: usize) -> RgbaBlock {
    let mut block = [0; BLOCK_PIXELS * 4];
    let pixels: &mut [[u8; 4]] = bytemuck::cast_slice_mut(&mut block[..]);

    for (index, pixel) in pixels.iter_mut().enumerate() {
        let alpha = source[(index / 4) * stride + (index % 4) * 4 + 3];
        *pixel = [alpha, alpha, alpha, u8::MAX];
    }

    block
}

/// Converts to scaled YCoCg stored as (Cg, Co, scale, Y). The scale channel is left at zero.
fn rgba_to_scaled_ycocg(block: &mut RgbaBlock) {
    let pixels: &mut [[u8; 4]] = bytemuck::cast_slice_mut(&mut block[..]);

    for pixel in pixels {
        let [red, green, blue, _] = pixel.map(i32::from);

        let green = (green + 1) >> 1;
        let t = (2 + red + blue) >> 2;

        let y = clamp_u8(green + t);
        let co = clamp_u8(128 + ((red - blue + 1) >> 1));
        let cg = clamp_u8(128 + green - t);

        *pixel = [cg, co, 0, y];
    }
}

#[inline(always)]
fn clamp_u8(value: i32) -> u8 {
    value.clamp(0, u8::MAX as i32) as u8
}
