//! Hap section headers.
//!
//! Every part of a Hap frame is a section: a length, a type byte and the section content. The
//! short header stores the length in 24 bits, the long header sets those bits to zero and
//! appends a 32 bit length. All integers are little endian.
//!
//! Texture sections whose data was split into chunks carry a decode instructions section in
//! front of the chunk payload, holding a compressor table and a chunk size table.

use byteorder::{ByteOrder, LittleEndian};

use crate::{Chunk, Compressor, Error, Result};

/// Size of a short section header.
pub const SHORT_HEADER_LEN: usize = 4;

/// Size of a long section header.
pub const LONG_HEADER_LEN: usize = 8;

/// Largest section length a short header can carry.
pub const MAX_SHORT_SECTION_LEN: usize = 0xFF_FFFF;

/// Decode instructions container.
pub const DECODE_INSTRUCTIONS: u8 = 0x01;

/// One compressor byte per chunk.
pub const COMPRESSOR_TABLE: u8 = 0x02;

/// One u32 compressed size per chunk.
pub const CHUNK_SIZE_TABLE: u8 = 0x03;

/// Top level section holding several texture sections.
pub const MULTIPLE_IMAGES: u8 = 0x0D;

/// Compressor bits of a texture split into chunks.
pub const COMPLEX: u8 = 0xC0;

/// Kind of section header.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum HeaderLength {
    /// 24 bit length
    Short,
    /// 32 bit length
    Long,
}

impl HeaderLength {
    /// Header size in bytes.
    pub const fn size(self) -> usize {
        match self {
            HeaderLength::Short => SHORT_HEADER_LEN,
            HeaderLength::Long => LONG_HEADER_LEN,
        }
    }

    /// Largest section length the header can carry.
    pub const fn max_section_len(self) -> usize {
        match self {
            HeaderLength::Short => MAX_SHORT_SECTION_LEN,
            HeaderLength::Long => u32::MAX as usize,
        }
    }
}

/// Content length of a decode instructions section for `chunk_count` chunks.
pub const fn decode_instructions_len(chunk_count: usize) -> usize {
    // compressor table header + entries, size table header + entries
    SHORT_HEADER_LEN + chunk_count + SHORT_HEADER_LEN + 4 * chunk_count
}

/// Bytes in front of the chunk payload of a texture section.
pub const fn texture_header_len(chunk_count: usize, header: HeaderLength) -> usize {
    if chunk_count > 1 {
        header.size() + SHORT_HEADER_LEN + decode_instructions_len(chunk_count)
    } else {
        header.size()
    }
}

/// Sequential writer of section headers into a fixed buffer.
pub struct SectionWriter<'a> {
    buffer: &'a mut [u8],
    position: usize,
}

impl<'a> SectionWriter<'a> {
    pub fn new(buffer: &'a mut [u8]) -> Self {
        Self {
            buffer,
            position: 0,
        }
    }

    /// Bytes written so far.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Writes a section header announcing `section_len` content bytes.
    pub fn write_header(
        &mut self,
        header: HeaderLength,
        section_len: usize,
        section_type: u8,
    ) -> Result<()> {
        if section_len > header.max_section_len() {
            return Err(Error::SectionTooLarge {
                length: section_len,
                header,
            });
        }

        let bytes = self.advance(header.size())?;
        match header {
            HeaderLength::Short => LittleEndian::write_u24(&mut bytes[..3], section_len as u32),
            HeaderLength::Long => {
                LittleEndian::write_u24(&mut bytes[..3], 0);
                LittleEndian::write_u32(&mut bytes[4..], section_len as u32);
            }
        }
        bytes[3] = section_type;

        Ok(())
    }

    pub fn put_u8(&mut self, value: u8) -> Result<()> {
        self.advance(1)?[0] = value;
        Ok(())
    }

    pub fn put_u32(&mut self, value: u32) -> Result<()> {
        LittleEndian::write_u32(self.advance(4)?, value);
        Ok(())
    }

    fn advance(&mut self, len: usize) -> Result<&mut [u8]> {
        let start = self.position;
        let end = start + len;

        if end > self.buffer.len() {
            return Err(Error::BufferTooSmall {
                needed: end,
                available: self.buffer.len(),
            });
        }

        self.position = end;
        Ok(&mut self.buffer[start..end])
    }
}

/// Writes the header of a texture section whose chunk payload of `payload_len` bytes follows.
///
/// A single chunk is described by the compressor bits of the type byte alone. Several chunks
/// get the complex compressor bits and a decode instructions section. Returns the header
/// size, [`texture_header_len`] for the chunk count.
pub fn write_texture_header(
    buffer: &mut [u8],
    header: HeaderLength,
    texture_type: u8,
    chunks: &[Chunk],
    payload_len: usize,
) -> Result<usize> {
    let chunk_count = chunks.len();
    let section_len = texture_header_len(chunk_count, header) - header.size() + payload_len;
    let mut writer = SectionWriter::new(buffer);

    match chunks {
        [] => return Err(Error::InvalidSection("texture without chunks".to_string())),
        [chunk] => writer.write_header(header, section_len, chunk.compressor.tag() | texture_type)?,
        _ => {
            writer.write_header(header, section_len, COMPLEX | texture_type)?;
            writer.write_header(
                HeaderLength::Short,
                decode_instructions_len(chunk_count),
                DECODE_INSTRUCTIONS,
            )?;

            writer.write_header(HeaderLength::Short, chunk_count, COMPRESSOR_TABLE)?;
            for chunk in chunks {
                writer.put_u8(chunk.compressor.tag() >> 4)?;
            }

            writer.write_header(HeaderLength::Short, 4 * chunk_count, CHUNK_SIZE_TABLE)?;
            for chunk in chunks {
                // bounded by the section length checked above
                writer.put_u32(chunk.compressed_size as u32)?;
            }
        }
    }

    Ok(writer.position())
}

/// A parsed section header.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct SectionHeader {
    pub section_type: u8,
    pub header: HeaderLength,
    /// Content length, excluding the header
    pub length: usize,
}

impl SectionHeader {
    /// Reads the section header at the start of `data`.
    pub fn parse(data: &[u8]) -> Result<Self> {
        ensure_len(data, SHORT_HEADER_LEN)?;

        let section_type = data[3];
        let length = LittleEndian::read_u24(data) as usize;
        if length != 0 {
            return Ok(Self {
                section_type,
                header: HeaderLength::Short,
                length,
            });
        }

        ensure_len(data, LONG_HEADER_LEN)?;
        Ok(Self {
            section_type,
            header: HeaderLength::Long,
            length: LittleEndian::read_u32(&data[4..]) as usize,
        })
    }

    /// Header plus content length.
    pub fn total_len(&self) -> usize {
        self.header.size() + self.length
    }

    /// Splits `data`, which starts with this header, into the section content and the bytes
    /// after the section.
    pub fn split<'a>(&self, data: &'a [u8]) -> Result<(&'a [u8], &'a [u8])> {
        ensure_len(data, self.total_len())?;
        let (section, rest) = data.split_at(self.total_len());
        Ok((&section[self.header.size()..], rest))
    }
}

fn ensure_len(data: &[u8], expected: usize) -> Result<()> {
    if data.len() < expected {
        return Err(Error::TruncatedSection {
            expected,
            actual: data.len(),
        });
    }
    Ok(())
}

/// Position of one chunk in a texture section's payload.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ChunkEntry {
    pub compressor: Compressor,
    pub offset: usize,
    pub size: usize,
}

/// A parsed texture section.
#[derive(Clone, Debug)]
pub struct TextureSection<'a> {
    pub header: SectionHeader,
    /// Texture format nibble of the type byte
    pub texture_type: u8,
    pub chunks: Vec<ChunkEntry>,
    /// Chunk payload, chunks stored back to back
    pub payload: &'a [u8],
}

impl<'a> TextureSection<'a> {
    /// Parses the texture section at the start of `data`, returning it with the bytes after it.
    pub fn parse(data: &'a [u8]) -> Result<(Self, &'a [u8])> {
        let header = SectionHeader::parse(data)?;
        let (body, rest) = header.split(data)?;
        let texture_type = header.section_type & 0x0F;
        let tag = header.section_type & 0xF0;

        let (chunks, payload) = if tag == COMPLEX {
            parse_decode_instructions(body)?
        } else {
            let compressor = Compressor::from_tag(tag).ok_or_else(|| {
                Error::InvalidSection(format!("unknown compressor bits {tag:#04x}"))
            })?;
            let chunk = ChunkEntry {
                compressor,
                offset: 0,
                size: body.len(),
            };
            (vec![chunk], body)
        };

        let section = Self {
            header,
            texture_type,
            chunks,
            payload,
        };

        Ok((section, rest))
    }

    /// Stored bytes of one chunk.
    pub fn chunk_data(&self, entry: &ChunkEntry) -> &'a [u8] {
        &self.payload[entry.offset..entry.offset + entry.size]
    }
}

fn parse_decode_instructions(body: &[u8]) -> Result<(Vec<ChunkEntry>, &[u8])> {
    let instructions = SectionHeader::parse(body)?;
    if instructions.section_type != DECODE_INSTRUCTIONS {
        return Err(Error::UnexpectedSection {
            expected: DECODE_INSTRUCTIONS,
            found: instructions.section_type,
        });
    }

    let (mut tables, payload) = instructions.split(body)?;
    let mut compressors = None;
    let mut sizes = None;

    while !tables.is_empty() {
        let table = SectionHeader::parse(tables)?;
        let (content, next) = table.split(tables)?;

        match table.section_type {
            COMPRESSOR_TABLE => {
                let entries = content
                    .iter()
                    .map(|&entry| compressor_table_entry(entry))
                    .collect::<Result<Vec<_>>>()?;
                compressors = Some(entries);
            }
            CHUNK_SIZE_TABLE => {
                if content.len() % 4 != 0 {
                    return Err(Error::InvalidSection(format!(
                        "chunk size table of {} bytes",
                        content.len()
                    )));
                }
                let entries = content
                    .chunks_exact(4)
                    .map(|size| LittleEndian::read_u32(size) as usize)
                    .collect::<Vec<_>>();
                sizes = Some(entries);
            }
            // offset tables and unknown sections are not needed to locate chunks
            _ => {}
        }

        tables = next;
    }

    let compressors = compressors
        .ok_or_else(|| Error::InvalidSection("missing compressor table".to_string()))?;
    let sizes =
        sizes.ok_or_else(|| Error::InvalidSection("missing chunk size table".to_string()))?;

    if compressors.len() != sizes.len() || compressors.is_empty() {
        return Err(Error::InvalidSection(format!(
            "{} compressors for {} chunk sizes",
            compressors.len(),
            sizes.len()
        )));
    }

    let mut offset = 0;
    let chunks = compressors
        .into_iter()
        .zip(sizes)
        .map(|(compressor, size)| {
            let entry = ChunkEntry {
                compressor,
                offset,
                size,
            };
            offset += size;
            entry
        })
        .collect();

    if offset != payload.len() {
        return Err(Error::InvalidSection(format!(
            "chunk sizes add up to {offset} bytes, payload holds {}",
            payload.len()
        )));
    }

    Ok((chunks, payload))
}

fn compressor_table_entry(entry: u8) -> Result<Compressor> {
    (entry & 0xF0 == 0)
        .then(|| Compressor::from_tag(entry << 4))
        .flatten()
        .ok_or_else(|| Error::InvalidSection(format!("unknown chunk compressor {entry:#04x}")))
}

/// All texture sections of a frame.
#[derive(Clone, Debug)]
pub struct FrameSections<'a> {
    /// Header of the outermost section
    pub header: SectionHeader,
    pub textures: Vec<TextureSection<'a>>,
}

impl<'a> FrameSections<'a> {
    /// Parses a complete frame. Bytes after the outermost section are rejected.
    pub fn parse(data: &'a [u8]) -> Result<Self> {
        let header = SectionHeader::parse(data)?;

        let (textures, rest) = if header.section_type == MULTIPLE_IMAGES {
            let (mut body, rest) = header.split(data)?;
            let mut textures = Vec::new();
            while !body.is_empty() {
                let (texture, next) = TextureSection::parse(body)?;
                textures.push(texture);
                body = next;
            }
            (textures, rest)
        } else {
            let (texture, rest) = TextureSection::parse(data)?;
            (vec![texture], rest)
        };

        if !rest.is_empty() {
            return Err(Error::InvalidSection(format!(
                "{} bytes after the frame",
                rest.len()
            )));
        }

        Ok(Self { header, textures })
    }
}
