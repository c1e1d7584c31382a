use std::{fs, path::PathBuf, time::Instant};

use anyhow::Context;
use hap_encoder::{
    section::FrameSections, Compressor, EncoderConfig, Frame, HapEncoder, PixelLayout,
    TextureFormat,
};
use image::ImageReader;
use tracing_subscriber::EnvFilter;

struct Args {
    format: TextureFormat,
    file_name: String,
    chunk_count: usize,
    compressor: Compressor,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let Some(args) = parse_args() else {
        return Ok(());
    };

    let layout = args.format.input_layout();

    let start = Instant::now();

    let image = ImageReader::open(&args.file_name)
        .with_context(|| format!("can't open input image {}", args.file_name))?
        .decode()
        .context("can't decode image")?;
    let (width, height) = (image.width(), image.height());
    let pixels = match layout {
        PixelLayout::Rgba8 => image.to_rgba8().into_raw(),
        PixelLayout::Gray8 => image.to_luma8().into_raw(),
    };

    let duration = start.elapsed();
    println!(
        "Image read took: {:.3} ms",
        duration.as_secs_f64() * 1000.0
    );

    let config = EncoderConfig::new(args.format)
        .with_chunk_count(args.chunk_count)
        .with_compressor(args.compressor);
    let mut encoder = HapEncoder::new(config, width, height)?;
    let frame = Frame::packed(&pixels, width, height, layout);

    let start = Instant::now();

    let packet = encoder.encode_frame_to_vec(&frame)?;

    let duration = start.elapsed();
    println!(
        "Encoding took: {:.3} ms",
        duration.as_secs_f64() * 1000.0
    );

    print_summary(&encoder, &packet)?;

    let start = Instant::now();

    let mut hap_name = PathBuf::from(&args.file_name);
    hap_name.set_extension("hap");
    fs::write(&hap_name, &packet)
        .with_context(|| format!("failed to write {}", hap_name.display()))?;

    let duration = start.elapsed();
    println!(
        "Hap output to disk took: {:.3} ms",
        duration.as_secs_f64() * 1000.0
    );

    Ok(())
}

fn print_summary(encoder: &HapEncoder, packet: &[u8]) -> anyhow::Result<()> {
    let sections = FrameSections::parse(packet).context("encoded frame doesn't parse")?;

    println!(
        "{} frame ({}): {} bytes, {} chunks per texture",
        encoder.config().format(),
        String::from_utf8_lossy(&encoder.fourcc()),
        packet.len(),
        encoder.chunk_count()
    );

    for (index, texture) in sections.textures.iter().enumerate() {
        let snappy = texture
            .chunks
            .iter()
            .filter(|chunk| chunk.compressor == Compressor::Snappy)
            .count();

        println!(
            "  texture {index}: type {:#04x}, {} of {} chunks snappy, {} payload bytes",
            texture.header.section_type,
            snappy,
            texture.chunks.len(),
            texture.payload.len()
        );
    }

    Ok(())
}

fn print_help() {
    println!("Usage: hap-compressor <format> <input_file> [chunk_count] [compressor]");
    println!("\nFormats:");
    println!("  hap       - DXT1 compression (RGB)");
    println!("  hap_alpha - DXT5 compression with smooth alpha (RGBA)");
    println!("  hap_q     - scaled YCoCg DXT5 compression (RGB)");
    println!("  hap_a     - RGTC1 compression of the luma (alpha only)");
    println!("  hap_r     - BC7 compression (RGBA)");
    println!("  hap_m     - scaled YCoCg DXT5 plus RGTC1 alpha (RGBA)");
    println!("\nCompressors:");
    println!("  snappy    - Snappy per chunk (default)");
    println!("  none      - store texture data as is");
}

fn parse_args() -> Option<Args> {
    let args: Vec<String> = std::env::args().collect();

    if !(3..=5).contains(&args.len()) || args.contains(&"--help".to_string()) {
        print_help();
        return None;
    }

    let format = match args[1].parse::<TextureFormat>() {
        Ok(format) => format,
        Err(error) => {
            println!("Error: {error}");
            print_help();
            return None;
        }
    };

    let chunk_count = match args.get(3).map(|count| count.parse::<usize>()) {
        None => 1,
        Some(Ok(count)) => count,
        Some(Err(_)) => {
            println!("Error: Invalid chunk count");
            print_help();
            return None;
        }
    };

    let compressor = match args.get(4).map(|name| name.parse::<Compressor>()) {
        None => Compressor::default(),
        Some(Ok(compressor)) => compressor,
        Some(Err(error)) => {
            println!("Error: {error}");
            print_help();
            return None;
        }
    };

    Some(Args {
        format,
        file_name: args[2].clone(),
        chunk_count,
        compressor,
    })
}
