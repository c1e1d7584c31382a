use hap_encoder::{
    section::{FrameSections, HeaderLength, SectionHeader, DECODE_INSTRUCTIONS, MULTIPLE_IMAGES},
    BlockEncoder, Compressor, EncoderConfig, Error, ErrorKind, Frame, HapEncoder, PixelLayout,
    TextureEncodingJob, TextureFormat,
};

use crate::common::{frame_for, gradient_rgba, noise, pixels_for, unpack_texture};

mod common;

fn encoder(format: TextureFormat, chunk_count: usize, compressor: Compressor) -> HapEncoder {
    let config = EncoderConfig::new(format)
        .with_chunk_count(chunk_count)
        .with_compressor(compressor);
    HapEncoder::new(config, 64, 64).unwrap()
}

#[test]
fn uncompressed_hap_frame() {
    let pixels = gradient_rgba(64, 64);
    let frame = Frame::packed(&pixels, 64, 64, PixelLayout::Rgba8);
    let mut encoder = encoder(TextureFormat::Hap, 8, Compressor::None);

    assert_eq!(encoder.chunk_count(), 1);

    let packet = encoder.encode_frame_to_vec(&frame).unwrap();
    assert_eq!(packet.len(), 2056);
    assert_eq!(packet[..8], [0x00, 0x00, 0x00, 0xAB, 0x00, 0x08, 0x00, 0x00]);

    let mut texture = vec![0u8; 2048];
    TextureEncodingJob::new(frame, BlockEncoder::Dxt1, 1)
        .execute(&mut texture)
        .unwrap();
    assert_eq!(packet[8..], texture);
}

#[test]
fn chunk_request_is_corrected_to_a_divisor() {
    let pixels = gradient_rgba(64, 64);
    let frame = Frame::packed(&pixels, 64, 64, PixelLayout::Rgba8);
    let mut encoder = encoder(TextureFormat::Hap, 3, Compressor::Snappy);

    assert_eq!(encoder.chunk_count(), 2);

    let packet = encoder.encode_frame_to_vec(&frame).unwrap();
    assert_eq!(packet[3], 0xCB);

    let instructions = SectionHeader::parse(&packet[8..]).unwrap();
    assert_eq!(instructions.section_type, DECODE_INSTRUCTIONS);
    assert_eq!(instructions.header, HeaderLength::Short);
    assert_eq!(instructions.length, 18);

    let sections = FrameSections::parse(&packet).unwrap();
    assert_eq!(sections.header.length, packet.len() - 8);

    let texture = &sections.textures[0];
    assert_eq!(texture.chunks.len(), 2);
    assert_eq!(
        texture.chunks.iter().map(|chunk| chunk.size).sum::<usize>(),
        texture.payload.len()
    );
    assert_eq!(texture.payload.len(), packet.len() - 8 - 4 - 18);
}

#[test]
fn chunked_frames_unpack_to_the_uncompressed_texture() {
    let rgba = gradient_rgba(64, 64);

    for format in TextureFormat::ALL {
        let pixels = pixels_for(format, &rgba);
        let frame = frame_for(format, &pixels, 64, 64);

        let raw = encoder(format, 1, Compressor::None)
            .encode_frame_to_vec(&frame)
            .unwrap();
        let chunked = encoder(format, 8, Compressor::Snappy)
            .encode_frame_to_vec(&frame)
            .unwrap();

        let raw = FrameSections::parse(&raw).unwrap();
        let chunked = FrameSections::parse(&chunked).unwrap();

        assert_eq!(raw.textures.len(), format.texture_count(), "{format}");
        assert_eq!(chunked.textures.len(), format.texture_count(), "{format}");

        for (raw, chunked) in raw.textures.iter().zip(&chunked.textures) {
            assert_eq!(raw.texture_type, chunked.texture_type, "{format}");
            assert_eq!(chunked.chunks.len(), 8, "{format}");
            assert_eq!(unpack_texture(chunked), raw.payload, "{format}");
        }
    }
}

#[test]
fn hap_m_wraps_two_short_texture_sections() {
    let pixels = gradient_rgba(64, 64);
    let frame = Frame::packed(&pixels, 64, 64, PixelLayout::Rgba8);
    let mut encoder = encoder(TextureFormat::HapM, 4, Compressor::Snappy);

    assert_eq!(encoder.fourcc(), *b"HapM");

    let packet = encoder.encode_frame_to_vec(&frame).unwrap();
    let sections = FrameSections::parse(&packet).unwrap();

    assert_eq!(sections.header.section_type, MULTIPLE_IMAGES);
    assert_eq!(sections.header.header, HeaderLength::Short);
    assert_eq!(sections.header.length, packet.len() - 4);

    let types = sections
        .textures
        .iter()
        .map(|texture| (texture.header.header, texture.header.section_type))
        .collect::<Vec<_>>();
    assert_eq!(
        types,
        [(HeaderLength::Short, 0xCF), (HeaderLength::Short, 0xC1)]
    );

    let sizes = sections
        .textures
        .iter()
        .map(|texture| (texture.chunks.len(), unpack_texture(texture).len()))
        .collect::<Vec<_>>();
    assert_eq!(sizes, [(4, 256 * 16), (4, 256 * 8)]);
}

#[test]
fn disabled_compressor_forces_a_single_chunk() {
    let pixels = gradient_rgba(64, 64);
    let frame = Frame::packed(&pixels, 64, 64, PixelLayout::Rgba8);

    for chunk_count in [1, 2, 16, 64] {
        let mut encoder = encoder(TextureFormat::HapAlpha, chunk_count, Compressor::None);
        assert_eq!(encoder.chunk_count(), 1);

        let packet = encoder.encode_frame_to_vec(&frame).unwrap();
        assert_eq!(packet[3], 0xAE);
        assert_eq!(packet.len(), 8 + 256 * 16);
    }
}

#[test]
fn chunk_table_is_contiguous_and_never_grows() {
    let pixels = noise(64 * 64 * 4, 7);
    let frame = Frame::packed(&pixels, 64, 64, PixelLayout::Rgba8);
    let mut encoder = encoder(TextureFormat::HapAlpha, 16, Compressor::Snappy);

    let packet = encoder.encode_frame_to_vec(&frame).unwrap();
    assert!(packet.len() <= encoder.max_frame_size());

    let chunks = encoder.chunks();
    assert_eq!(chunks.len(), 16);
    assert_eq!(chunks[0].compressed_offset, 0);

    for pair in chunks.windows(2) {
        assert_eq!(
            pair[1].compressed_offset,
            pair[0].compressed_offset + pair[0].compressed_size
        );
    }

    for chunk in chunks {
        assert!(chunk.compressed_size <= chunk.uncompressed_size);
        if chunk.compressed_size == chunk.uncompressed_size {
            assert_eq!(chunk.compressor, Compressor::None);
        }
    }
}

#[test]
fn padded_frames_encode_like_packed_frames() {
    let packed = gradient_rgba(64, 64);
    let stride = 64 * 4 + 32;
    let mut padded = noise(stride * 64, 3);
    for (row, source) in padded.chunks_exact_mut(stride).zip(packed.chunks_exact(64 * 4)) {
        row[..source.len()].copy_from_slice(source);
    }

    let mut encoder = encoder(TextureFormat::HapQ, 4, Compressor::Snappy);
    let expected = encoder
        .encode_frame_to_vec(&Frame::packed(&packed, 64, 64, PixelLayout::Rgba8))
        .unwrap();
    let actual = encoder
        .encode_frame_to_vec(&Frame::new(&padded, stride, 64, 64, PixelLayout::Rgba8))
        .unwrap();

    assert_eq!(actual, expected);
}

#[test]
fn encoder_is_reusable_across_frames() {
    let first = gradient_rgba(64, 64);
    let second = noise(64 * 64 * 4, 11);
    let mut encoder = encoder(TextureFormat::Hap, 4, Compressor::Snappy);

    let mut encode = |pixels: &[u8]| {
        encoder
            .encode_frame_to_vec(&Frame::packed(pixels, 64, 64, PixelLayout::Rgba8))
            .unwrap()
    };

    let a = encode(&first);
    let b = encode(&second);
    let c = encode(&first);

    assert_eq!(a, c);
    assert_ne!(a, b);
}

#[test]
fn encode_frame_reports_the_written_size() {
    let pixels = noise(32 * 32 * 4, 5);
    let frame = Frame::packed(&pixels, 32, 32, PixelLayout::Rgba8);
    let config = EncoderConfig::new(TextureFormat::HapR).with_chunk_count(4);
    let mut encoder = HapEncoder::new(config, 32, 32).unwrap();

    let mut output = vec![0u8; encoder.max_frame_size()];
    let size = encoder.encode_frame(&frame, &mut output).unwrap();

    let sections = FrameSections::parse(&output[..size]).unwrap();
    assert_eq!(sections.header.total_len(), size);
    assert_eq!(sections.textures[0].texture_type, 0x0C);
}

#[test]
fn oversized_hap_m_texture_fails_with_capacity_error() {
    let (width, height) = (4096, 4096);
    let pixels = vec![0x80u8; (width * height * 4) as usize];
    let frame = Frame::packed(&pixels, width, height, PixelLayout::Rgba8);
    let config = EncoderConfig::new(TextureFormat::HapM).with_compressor(Compressor::None);
    let mut encoder = HapEncoder::new(config, width, height).unwrap();

    let error = encoder.encode_frame_to_vec(&frame).unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Capacity);
    assert!(matches!(
        error,
        Error::SectionTooLarge {
            length: 0x100_0000,
            header: HeaderLength::Short
        }
    ));
}
