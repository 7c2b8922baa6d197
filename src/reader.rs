//! Reading GM1 archives.

use std::fs::File;
use std::io::{self, Read, Seek};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt};

use crate::color::{colors, Color};
use crate::error::{Error, Result};
use crate::image::Image;
use crate::palette::Palette;
use crate::pixel_format::{PixelFormat, INDEXED8, TGX16};
use crate::rect::Rect;
use crate::tgx;

use crate::header::{verify_size_category, Encoding, EntryHeader, Header, PALETTE_COUNT};

/// Open-time switches. The size-category check is optional because two
/// category slots have no observed dimensions and real archives use them.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct OpenFlags {
    pub check_size_category: bool,
}

#[derive(Clone, Debug)]
struct ReaderEntry {
    header: EntryHeader,
    offset: u32,
    size: u32,
}

/// An opened archive: header, ten palettes, entry tables and a snapshot
/// of the data region. Entries decode on demand and independently; a bad
/// entry fails that entry, not the archive.
pub struct Reader {
    header: Header,
    palettes: Vec<Palette>,
    entries: Vec<ReaderEntry>,
    data: Vec<u8>,
    encoding: Encoding,
    transparent_color: Color,
}

impl Reader {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Reader> {
        Reader::new(io::BufReader::new(File::open(path)?))
    }

    pub fn from_file_with_flags<P: AsRef<Path>>(path: P, flags: OpenFlags) -> Result<Reader> {
        Reader::with_flags(io::BufReader::new(File::open(path)?), flags)
    }

    pub fn from_mem(data: &[u8]) -> Result<Reader> {
        Reader::new(io::Cursor::new(data))
    }

    pub fn new<R: Read + Seek>(stream: R) -> Result<Reader> {
        Reader::with_flags(stream, OpenFlags::default())
    }

    pub fn with_flags<R: Read + Seek>(mut stream: R, flags: OpenFlags) -> Result<Reader> {
        let header = Header::load(&mut stream)?;

        let encoding = header.encoding();
        if encoding == Encoding::Unknown {
            return Err(Error::format_mismatch(format!(
                "unknown data class {}",
                header.data_class()
            )));
        }
        if flags.check_size_category {
            verify_size_category(&header)?;
        }

        // The preamble grows with the image count, so a forged count
        // trips this before any table is allocated.
        let origin = stream.stream_position()?;
        let total = stream.seek(io::SeekFrom::End(0))?;
        stream.seek(io::SeekFrom::Start(origin))?;
        if header.preamble_size() + header.data_size() as u64 > total {
            return Err(Error::UnexpectedEof);
        }

        let mut palettes = Vec::with_capacity(PALETTE_COUNT);
        for _ in 0..PALETTE_COUNT {
            palettes.push(Palette::load(&mut stream)?);
        }

        let count = header.image_count() as usize;
        let mut offsets = vec![0u32; count];
        stream.read_u32_into::<LittleEndian>(&mut offsets)?;
        let mut sizes = vec![0u32; count];
        stream.read_u32_into::<LittleEndian>(&mut sizes)?;

        let mut entries = Vec::with_capacity(count);
        for i in 0..count {
            entries.push(ReaderEntry {
                header: EntryHeader::load(&mut stream)?,
                offset: offsets[i],
                size: sizes[i],
            });
        }

        let data_size = header.data_size() as u64;
        for entry in &entries {
            if entry.offset as u64 + entry.size as u64 > data_size {
                return Err(Error::format_mismatch(format!(
                    "entry payload [{}, +{}) outside the data region of {} bytes",
                    entry.offset, entry.size, data_size
                )));
            }
        }
        let mut order: Vec<usize> = (0..count).collect();
        order.sort_by_key(|&i| entries[i].offset);
        let mut prev_end = 0u64;
        for &i in &order {
            if (entries[i].offset as u64) < prev_end {
                return Err(Error::format_mismatch(format!(
                    "entry payload at offset {} overlaps its predecessor",
                    entries[i].offset
                )));
            }
            prev_end = entries[i].offset as u64 + entries[i].size as u64;
        }

        let mut data = vec![0u8; header.data_size() as usize];
        stream.read_exact(&mut data)?;

        Ok(Reader {
            header,
            palettes,
            entries,
            data,
            encoding,
            transparent_color: colors::MAGENTA,
        })
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    pub fn num_entries(&self) -> usize {
        self.entries.len()
    }

    pub fn num_palettes(&self) -> usize {
        self.palettes.len()
    }

    pub fn palette(&self, index: usize) -> Result<&Palette> {
        self.palettes.get(index).ok_or(Error::IndexOutOfRange {
            index,
            count: self.palettes.len(),
        })
    }

    fn entry(&self, index: usize) -> Result<&ReaderEntry> {
        self.entries.get(index).ok_or(Error::IndexOutOfRange {
            index,
            count: self.entries.len(),
        })
    }

    pub fn entry_header(&self, index: usize) -> Result<&EntryHeader> {
        Ok(&self.entry(index)?.header)
    }

    pub fn entry_size(&self, index: usize) -> Result<u32> {
        Ok(self.entry(index)?.size)
    }

    /// Raw payload bytes of one entry.
    pub fn entry_data(&self, index: usize) -> Result<&[u8]> {
        let entry = self.entry(index)?;
        Ok(&self.data[entry.offset as usize..(entry.offset + entry.size) as usize])
    }

    /// Background color decoded entries start from; also installed as
    /// their color key.
    pub fn set_transparent_color(&mut self, color: Color) {
        self.transparent_color = color;
    }

    pub fn transparent_color(&self) -> Color {
        self.transparent_color
    }

    /// Decodes one entry into a fresh image of its natural size.
    pub fn read_entry(&self, index: usize) -> Result<Image> {
        let entry = self.entry(index)?;
        let data = self.entry_data(index)?;
        let header = &entry.header;

        match self.encoding {
            Encoding::Tgx16 | Encoding::Font => {
                // Fonts carry no special treatment; they are plain
                // 16-bit compressed glyphs.
                let mut image =
                    self.create_target(header.width as i64, header.height as i64, TGX16)?;
                let mut stream = data;
                tgx::decode_image(&mut stream, data.len() as u64, &mut image.full_view())?;
                Ok(image)
            }
            Encoding::Tgx8 => {
                let mut image =
                    self.create_target(header.width as i64, header.height as i64, INDEXED8)?;
                let mut stream = data;
                tgx::decode_image(&mut stream, data.len() as u64, &mut image.full_view())?;
                Ok(image)
            }
            Encoding::Bitmap => {
                // The truncation by seven rows is a quirk of the shipped
                // data; nobody knows why.
                let mut image =
                    self.create_target(header.width as i64, header.height as i64 - 7, TGX16)?;
                let row_bytes = image.width() as usize * image.format().bytes_per_pixel();
                let mut remaining = data;
                let mut lock = image.lock();
                for y in 0..lock.height() {
                    if remaining.len() < row_bytes {
                        break;
                    }
                    lock.row_mut(y).copy_from_slice(&remaining[..row_bytes]);
                    remaining = &remaining[row_bytes..];
                }
                drop(lock);
                Ok(image)
            }
            Encoding::TileObject => {
                let height = header.tile_y as i64 + header.height as i64;
                let mut image = self.create_target(tgx::TILE_WIDTH as i64, height, TGX16)?;

                let mut stream = data;
                {
                    let tile_rect = Rect::new(
                        0,
                        header.tile_y as i32,
                        tgx::TILE_WIDTH as i32,
                        tgx::TILE_HEIGHT as i32,
                    );
                    let mut tile = image.view_mut(tile_rect)?;
                    tgx::decode_tile(&mut stream, &mut tile)?;
                }

                // The building sprite sits above the tile, sharing the
                // rest of the payload.
                if !stream.is_empty() && header.box_width > 0 && header.height > 0 {
                    let box_rect = Rect::new(
                        header.h_offset as i32,
                        0,
                        header.box_width as i32,
                        header.height as i32,
                    );
                    let box_bytes = stream.len() as u64;
                    let mut boxed = image.view_mut(box_rect)?;
                    tgx::decode_image(&mut stream, box_bytes, &mut boxed)?;
                }
                Ok(image)
            }
            Encoding::Unknown => unreachable!("rejected at open"),
        }
    }

    fn create_target(&self, width: i64, height: i64, format: PixelFormat) -> Result<Image> {
        if width <= 0 || height <= 0 || width > u32::MAX as i64 || height > u32::MAX as i64 {
            return Err(Error::InvalidArgument("entry dimensions must be positive"));
        }
        let mut image = Image::new(width as u32, height as u32, format)?;
        image.set_color_key(self.transparent_color);
        // On indexed targets the fill packs to index 0, the archives'
        // transparent entry.
        image.fill(self.transparent_color);
        Ok(image)
    }
}
