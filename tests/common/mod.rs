#![allow(dead_code)]

use hap_encoder::{section::TextureSection, Compressor, Frame, PixelLayout, TextureFormat};

/// Smooth RGBA test pattern with a diagonal alpha ramp.
pub fn gradient_rgba(width: u32, height: u32) -> Vec<u8> {
    (0..height)
        .flat_map(|y| {
            (0..width).flat_map(move |x| {
                [
                    (x * 255 / width) as u8,
                    (y * 255 / height) as u8,
                    ((x + y) * 127 / (width + height)) as u8,
                    ((x + y) * 255 / (width + height)) as u8,
                ]
            })
        })
        .collect()
}

/// Pseudo random bytes, reproducible per seed.
pub fn noise(len: usize, seed: u32) -> Vec<u8> {
    let mut state = seed | 1;
    (0..len)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            (state >> 24) as u8
        })
        .collect()
}

/// Pixels in the layout `format` reads: RGBA as is, gray from the red channel.
pub fn pixels_for(format: TextureFormat, rgba: &[u8]) -> Vec<u8> {
    match format.input_layout() {
        PixelLayout::Rgba8 => rgba.to_vec(),
        PixelLayout::Gray8 => rgba.chunks_exact(4).map(|pixel| pixel[0]).collect(),
    }
}

pub fn frame_for<'a>(
    format: TextureFormat,
    pixels: &'a [u8],
    width: u32,
    height: u32,
) -> Frame<'a> {
    Frame::packed(pixels, width, height, format.input_layout())
}

/// Reassembles the block compressed texture stored in a texture section.
pub fn unpack_texture(texture: &TextureSection) -> Vec<u8> {
    let mut decoder = snap::raw::Decoder::new();
    let mut unpacked = Vec::new();

    for entry in &texture.chunks {
        let data = texture.chunk_data(entry);
        match entry.compressor {
            Compressor::None => unpacked.extend_from_slice(data),
            Compressor::Snappy => {
                unpacked.extend(decoder.decompress_vec(data).expect("invalid snappy chunk"))
            }
        }
    }

    unpacked
}
