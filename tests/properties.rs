use hap_encoder::{
    correct_chunk_count, section::FrameSections, ChunkCompressionJob, ChunkCompressor, Compressor,
    EncoderConfig, HapEncoder, SnappyCompressor, TextureFormat, MAX_CHUNKS,
};
use proptest::prelude::*;

use crate::common::{frame_for, noise, pixels_for, unpack_texture};

mod common;

fn texture_format() -> impl Strategy<Value = TextureFormat> {
    prop::sample::select(TextureFormat::ALL.to_vec())
}

fn compressor() -> impl Strategy<Value = Compressor> {
    prop_oneof![Just(Compressor::None), Just(Compressor::Snappy)]
}

/// Block compressed data with runs, so some chunks shrink and some don't.
fn texture_data() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec((any::<u8>(), 1usize..64), 1..64).prop_map(|runs| {
        runs.into_iter()
            .flat_map(|(value, len)| std::iter::repeat(value).take(len))
            .collect()
    })
}

proptest! {
    #[test]
    fn corrected_chunk_count_divides_block_count(
        block_count in 1usize..100_000,
        requested in 1usize..=MAX_CHUNKS,
    ) {
        let chunk_count = correct_chunk_count(requested, block_count, Compressor::Snappy);

        prop_assert!(chunk_count >= 1);
        prop_assert!(chunk_count <= requested);
        prop_assert_eq!(block_count % chunk_count, 0);
        prop_assert_eq!(correct_chunk_count(requested, block_count, Compressor::None), 1);
    }

    #[test]
    fn chunk_table_is_a_prefix_sum(
        data in texture_data(),
        requested in 1usize..=16,
    ) {
        let chunk_count = correct_chunk_count(requested, data.len(), Compressor::Snappy);
        let mut compressor = ChunkCompressor::new(SnappyCompressor::new());
        let job = ChunkCompressionJob {
            texture: &data,
            chunk_count,
            max_chunk_len: compressor.max_compressed_len(data.len() / chunk_count),
        };
        let mut payload = vec![0u8; job.max_payload_len()];
        let size = compressor.compress(&job, &mut payload).unwrap();

        let mut offset = 0;
        for chunk in compressor.chunks() {
            prop_assert_eq!(chunk.compressed_offset, offset);
            prop_assert!(chunk.compressed_size <= chunk.uncompressed_size);
            if chunk.compressed_size == chunk.uncompressed_size {
                prop_assert_eq!(chunk.compressor, Compressor::None);
            }
            offset += chunk.compressed_size;
        }
        prop_assert_eq!(offset, size);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn encoded_frames_parse_back(
        format in texture_format(),
        compressor in compressor(),
        requested in 1usize..=16,
        blocks_x in 1u32..=8,
        blocks_y in 1u32..=8,
        seed in any::<u32>(),
    ) {
        let (width, height) = (blocks_x * 4, blocks_y * 4);
        let rgba = noise((width * height * 4) as usize, seed);
        let pixels = pixels_for(format, &rgba);
        let frame = frame_for(format, &pixels, width, height);

        let config = EncoderConfig::new(format)
            .with_chunk_count(requested)
            .with_compressor(compressor);
        let mut encoder = HapEncoder::new(config, width, height).unwrap();
        let packet = encoder.encode_frame_to_vec(&frame).unwrap();

        prop_assert!(packet.len() <= encoder.max_frame_size());

        let sections = FrameSections::parse(&packet).unwrap();
        prop_assert_eq!(sections.header.total_len(), packet.len());
        prop_assert_eq!(sections.header.section_type & 0x0F, format.section_type());
        prop_assert_eq!(sections.textures.len(), format.texture_count());

        for (texture, sizing) in sections.textures.iter().zip(&encoder.layout().textures) {
            prop_assert_eq!(texture.texture_type, sizing.encoder.section_type());
            prop_assert_eq!(texture.chunks.len(), encoder.chunk_count());
            prop_assert_eq!(
                texture.chunks.iter().map(|chunk| chunk.size).sum::<usize>(),
                texture.payload.len()
            );
            prop_assert_eq!(unpack_texture(texture).len(), sizing.texture_size);

            if compressor == Compressor::None {
                prop_assert!(texture.chunks.iter().all(|chunk| chunk.compressor == Compressor::None));
            }
        }
    }
}
