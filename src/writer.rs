//! Writing GM1 archives, the mirror of the reader.

use std::io::Write;

use byteorder::{LittleEndian, WriteBytesExt};

use crate::error::{Error, Result};
use crate::image::Image;
use crate::palette::Palette;
use crate::rect::Rect;
use crate::tgx;

use crate::header::{Encoding, EntryHeader, Header, PALETTE_COUNT};

pub fn write_header<W: Write>(out: &mut W, header: &Header) -> Result<()> {
    header.write(out)
}

pub fn write_palette<W: Write>(out: &mut W, palette: &Palette) -> Result<()> {
    palette.write(out)
}

/// One entry ready to be written: its geometry header and its payload
/// bytes. Carrying raw bytes keeps read → write → read byte-exact; use
/// [`ArchiveEntry::from_image`] to build the payload from a decoded
/// image instead.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub header: EntryHeader,
    pub payload: Vec<u8>,
}

impl ArchiveEntry {
    pub fn new(header: EntryHeader, payload: Vec<u8>) -> ArchiveEntry {
        ArchiveEntry { header, payload }
    }

    /// Runs the encoder matching `encoding` over a decoded image.
    ///
    /// TileObject entries expect the composed layout the reader
    /// produces: the rhombus at `(0, tileY)` and the box sprite at
    /// `(hOffset, 0)`.
    pub fn from_image(header: EntryHeader, encoding: Encoding, image: &Image) -> Result<ArchiveEntry> {
        let mut payload = Vec::new();
        let bytes_pp = image.format().bytes_per_pixel();

        match encoding {
            Encoding::Tgx16 | Encoding::Tgx8 | Encoding::Font => {
                tgx::encode_image(&mut payload, image)?;
            }
            Encoding::Bitmap => {
                for y in 0..image.height() {
                    payload.extend_from_slice(image.row(y));
                }
            }
            Encoding::TileObject => {
                tgx::encode_tile(&mut payload, image, 0, header.tile_y as u32)?;

                let box_rect = Rect::new(
                    header.h_offset as i32,
                    0,
                    header.box_width as i32,
                    header.height as i32,
                )
                .intersection(&image.bounds());
                for y in box_rect.y..box_rect.y + box_rect.h {
                    let row = image.row(y as u32);
                    let x0 = box_rect.x as usize * bytes_pp;
                    let x1 = (box_rect.x + box_rect.w) as usize * bytes_pp;
                    tgx::encode_row(&mut payload, &row[x0..x1], bytes_pp)?;
                }
            }
            Encoding::Unknown => {
                return Err(Error::InvalidArgument("cannot encode an unknown encoding"));
            }
        }

        Ok(ArchiveEntry { header, payload })
    }
}

/// Writes a whole archive: header, ten palettes, offset and size tables,
/// entry headers, then payloads in index order.
///
/// `imageCount`, the tables and `dataSize` are recomputed from the
/// entries; every other header slot is emitted verbatim.
pub fn write_archive<W: Write>(
    out: &mut W,
    header: &Header,
    palettes: &[Palette],
    entries: &[ArchiveEntry],
) -> Result<()> {
    if palettes.len() != PALETTE_COUNT {
        return Err(Error::InvalidArgument("an archive carries exactly 10 palettes"));
    }
    let count = u32::try_from(entries.len())
        .map_err(|_| Error::InvalidArgument("too many entries for an archive"))?;

    let mut offsets = Vec::with_capacity(entries.len());
    let mut data_size = 0u64;
    for entry in entries {
        offsets.push(data_size);
        data_size += entry.payload.len() as u64;
    }
    let data_size = u32::try_from(data_size)
        .map_err(|_| Error::InvalidArgument("payloads exceed the data region limit"))?;

    let mut fixed = header.clone();
    fixed.set_image_count(count);
    fixed.set_data_size(data_size);
    fixed.write(out)?;

    for palette in palettes {
        palette.write(out)?;
    }
    for &offset in &offsets {
        out.write_u32::<LittleEndian>(offset as u32)?;
    }
    for entry in entries {
        out.write_u32::<LittleEndian>(entry.payload.len() as u32)?;
    }
    for entry in entries {
        entry.header.write(out)?;
    }
    for entry in entries {
        out.write_all(&entry.payload)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::HEADER_FIELDS;
    use crate::reader::Reader;
    use crate::color::colors;
    use crate::pixel_format::TGX16;

    fn ten_palettes() -> Vec<Palette> {
        (0..PALETTE_COUNT as u16)
            .map(|n| Palette::new([n.wrapping_mul(0x0101); 256]))
            .collect()
    }

    #[test]
    fn written_archive_reads_back() {
        let mut fields = [0u32; HEADER_FIELDS];
        fields[0] = 0xDEAD;
        fields[5] = 1;
        fields[21] = 0xBEEF;
        let header = Header::new(fields);

        let entries = vec![
            ArchiveEntry::new(
                EntryHeader {
                    width: 4,
                    height: 1,
                    ..EntryHeader::default()
                },
                vec![0x23, 0x80], // four transparent pixels, line feed
            ),
            ArchiveEntry::new(EntryHeader::default(), vec![0x80]),
        ];

        let mut bytes = Vec::new();
        write_archive(&mut bytes, &header, &ten_palettes(), &entries).unwrap();

        let reader = Reader::from_mem(&bytes).unwrap();
        assert_eq!(reader.header().image_count(), 2);
        assert_eq!(reader.header().data_size(), 3);
        assert_eq!(reader.header().fields()[0], 0xDEAD);
        assert_eq!(reader.header().fields()[21], 0xBEEF);
        assert_eq!(reader.entry_data(0).unwrap(), &entries[0].payload[..]);
        assert_eq!(reader.entry_data(1).unwrap(), &entries[1].payload[..]);
        assert_eq!(reader.entry_header(0).unwrap().width, 4);
        assert_eq!(reader.palette(3).unwrap(), &ten_palettes()[3]);
    }

    #[test]
    fn from_image_bitmap_dumps_raw_rows() {
        let mut image = Image::new(2, 2, TGX16).unwrap();
        image.fill(colors::WHITE);
        let entry = ArchiveEntry::from_image(
            EntryHeader::default(),
            Encoding::Bitmap,
            &image,
        )
        .unwrap();
        assert_eq!(entry.payload.len(), 8);
        assert_eq!(&entry.payload[..2], &0xFFFFu16.to_le_bytes());
    }

    #[test]
    fn wrong_palette_count_is_rejected() {
        let header = Header::default();
        let mut bytes = Vec::new();
        assert!(matches!(
            write_archive(&mut bytes, &header, &[], &[]),
            Err(Error::InvalidArgument(_))
        ));
    }
}
