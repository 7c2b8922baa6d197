//! GM1: the sprite archive container of Stronghold assets.
//!
//! An archive is a fixed 88-byte header, ten 512-byte palettes, per-entry
//! offset and size tables, per-entry geometry headers and finally the
//! data region holding every entry's TGX-encoded payload.

use std::fmt;
use std::io;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::error::{Error, Result};

/// Palettes per archive.
pub const PALETTE_COUNT: usize = 10;

pub const HEADER_FIELDS: usize = 22;
pub const HEADER_BYTES: u64 = 88;
pub const PALETTE_BYTES: u64 = 512;
pub const ENTRY_HEADER_BYTES: u64 = 16;

/// Index 0 of every palette is the transparent entry of 8-bit sprites.
pub const TGX8_TRANSPARENT_INDEX: u8 = 0;

/// The archive header: 22 little-endian u32 slots.
///
/// Kept as a plain array since only a handful of slots carry known
/// meaning; the rest round-trip verbatim through read and write.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Header {
    fields: [u32; HEADER_FIELDS],
}

impl Header {
    pub fn new(fields: [u32; HEADER_FIELDS]) -> Header {
        Header { fields }
    }

    pub fn load<R: io::Read>(stream: &mut R) -> Result<Header> {
        let mut fields = [0u32; HEADER_FIELDS];
        stream
            .read_u32_into::<LittleEndian>(&mut fields)
            .map_err(|err| {
                if err.kind() == io::ErrorKind::UnexpectedEof {
                    Error::UnexpectedEof
                } else {
                    Error::Io(err)
                }
            })?;
        Ok(Header { fields })
    }

    pub fn write<W: io::Write>(&self, stream: &mut W) -> Result<()> {
        for &field in &self.fields {
            stream.write_u32::<LittleEndian>(field)?;
        }
        Ok(())
    }

    pub fn fields(&self) -> &[u32; HEADER_FIELDS] {
        &self.fields
    }

    pub fn image_count(&self) -> u32 {
        self.fields[3]
    }

    pub fn set_image_count(&mut self, count: u32) {
        self.fields[3] = count;
    }

    pub fn data_class(&self) -> u32 {
        self.fields[5]
    }

    pub fn set_data_class(&mut self, class: u32) {
        self.fields[5] = class;
    }

    pub fn size_category(&self) -> SizeCategory {
        SizeCategory::from_raw(self.fields[8])
    }

    pub fn set_size_category(&mut self, category: SizeCategory) {
        self.fields[8] = category as u32;
    }

    pub fn width(&self) -> u32 {
        self.fields[12]
    }

    pub fn set_width(&mut self, width: u32) {
        self.fields[12] = width;
    }

    pub fn height(&self) -> u32 {
        self.fields[13]
    }

    pub fn set_height(&mut self, height: u32) {
        self.fields[13] = height;
    }

    pub fn anchor_x(&self) -> u32 {
        self.fields[18]
    }

    pub fn anchor_y(&self) -> u32 {
        self.fields[19]
    }

    pub fn data_size(&self) -> u32 {
        self.fields[20]
    }

    pub fn set_data_size(&mut self, size: u32) {
        self.fields[20] = size;
    }

    pub fn encoding(&self) -> Encoding {
        Encoding::from_data_class(self.data_class())
    }

    /// Bytes before the data region: header, palettes, offset and size
    /// tables, entry headers.
    pub fn preamble_size(&self) -> u64 {
        HEADER_BYTES
            + PALETTE_COUNT as u64 * PALETTE_BYTES
            + self.image_count() as u64 * (4 + 4 + ENTRY_HEADER_BYTES)
    }

    /// Name of a header slot for diagnostic dumps, unknown slots keeping
    /// their traditional `u<n>` labels.
    pub fn field_name(index: usize) -> &'static str {
        const NAMES: [&str; HEADER_FIELDS] = [
            "u1",
            "u2",
            "u3",
            "imageCount",
            "u4",
            "dataClass",
            "u5",
            "u6",
            "sizeCategory",
            "u7",
            "u8",
            "u9",
            "width",
            "height",
            "u10",
            "u11",
            "u12",
            "u13",
            "anchorX",
            "anchorY",
            "dataSize",
            "u14",
        ];
        NAMES[index]
    }
}

/// Geometry header of one archive entry, 16 bytes on disk.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub struct EntryHeader {
    pub width: u16,
    pub height: u16,
    pub pos_x: u16,
    pub pos_y: u16,
    pub group: u8,
    pub group_size: u8,
    pub tile_y: u16,
    pub tile_orient: u8,
    pub h_offset: u8,
    pub box_width: u8,
    pub flags: u8,
}

impl EntryHeader {
    pub fn load<R: io::Read>(stream: &mut R) -> Result<EntryHeader> {
        Ok(EntryHeader {
            width: stream.read_u16::<LittleEndian>()?,
            height: stream.read_u16::<LittleEndian>()?,
            pos_x: stream.read_u16::<LittleEndian>()?,
            pos_y: stream.read_u16::<LittleEndian>()?,
            group: stream.read_u8()?,
            group_size: stream.read_u8()?,
            tile_y: stream.read_u16::<LittleEndian>()?,
            tile_orient: stream.read_u8()?,
            h_offset: stream.read_u8()?,
            box_width: stream.read_u8()?,
            flags: stream.read_u8()?,
        })
    }

    pub fn write<W: io::Write>(&self, stream: &mut W) -> Result<()> {
        stream.write_u16::<LittleEndian>(self.width)?;
        stream.write_u16::<LittleEndian>(self.height)?;
        stream.write_u16::<LittleEndian>(self.pos_x)?;
        stream.write_u16::<LittleEndian>(self.pos_y)?;
        stream.write_u8(self.group)?;
        stream.write_u8(self.group_size)?;
        stream.write_u16::<LittleEndian>(self.tile_y)?;
        stream.write_u8(self.tile_orient)?;
        stream.write_u8(self.h_offset)?;
        stream.write_u8(self.box_width)?;
        stream.write_u8(self.flags)?;
        Ok(())
    }
}

/// How the payload of every entry in an archive is encoded, derived from
/// the header's data-class slot.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Encoding {
    Tgx16,
    Tgx8,
    TileObject,
    Bitmap,
    Font,
    Unknown,
}

impl Encoding {
    pub fn from_data_class(data_class: u32) -> Encoding {
        match data_class {
            1 => Encoding::Tgx16,
            2 => Encoding::Tgx8,
            3 => Encoding::TileObject,
            4 => Encoding::Font,
            5 => Encoding::Bitmap,
            6 => Encoding::Tgx16,
            7 => Encoding::Bitmap,
            _ => Encoding::Unknown,
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Encoding::Tgx16 => "TGX16",
            Encoding::Tgx8 => "TGX8",
            Encoding::TileObject => "TileObject",
            Encoding::Bitmap => "Bitmap",
            Encoding::Font => "Font",
            Encoding::Unknown => "Unknown",
        };
        f.write_str(name)
    }
}

/// Traditional description of a data class.
pub fn data_class_name(data_class: u32) -> &'static str {
    match data_class {
        1 => "Compressed 16 bit image",
        2 => "Compressed animation",
        3 => "Tile Object",
        4 => "Compressed font",
        5 => "Uncompressed bitmap",
        6 => "Compressed const size image",
        7 => "Uncompressed bitmap (other)",
        _ => "Unknown",
    }
}

/// Tile-atlas dimension label declared in the archive header. Two slots
/// have no observed dimensions and stay opaque.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum SizeCategory {
    Undefined = 0,
    Size30x30 = 1,
    Size55x55 = 2,
    Size75x75 = 3,
    Unknown0 = 4,
    Size100x100 = 5,
    Size110x110 = 6,
    Size130x130 = 7,
    Unknown1 = 8,
    Size185x185 = 9,
    Size250x250 = 10,
    Size180x180 = 11,
}

impl SizeCategory {
    /// Out-of-range raw values read as `Undefined`; a plain open never
    /// consults the category, so nothing is lost.
    pub fn from_raw(raw: u32) -> SizeCategory {
        match raw {
            1 => SizeCategory::Size30x30,
            2 => SizeCategory::Size55x55,
            3 => SizeCategory::Size75x75,
            4 => SizeCategory::Unknown0,
            5 => SizeCategory::Size100x100,
            6 => SizeCategory::Size110x110,
            7 => SizeCategory::Size130x130,
            8 => SizeCategory::Unknown1,
            9 => SizeCategory::Size185x185,
            10 => SizeCategory::Size250x250,
            11 => SizeCategory::Size180x180,
            _ => SizeCategory::Undefined,
        }
    }

    pub fn from_dims(width: u32, height: u32) -> SizeCategory {
        for raw in 1..=11 {
            let category = SizeCategory::from_raw(raw);
            if category.dims() == Some((width, height)) {
                return category;
            }
        }
        SizeCategory::Undefined
    }

    pub fn dims(&self) -> Option<(u32, u32)> {
        match self {
            SizeCategory::Size30x30 => Some((30, 30)),
            SizeCategory::Size55x55 => Some((55, 55)),
            SizeCategory::Size75x75 => Some((75, 75)),
            SizeCategory::Size100x100 => Some((100, 100)),
            SizeCategory::Size110x110 => Some((110, 110)),
            SizeCategory::Size130x130 => Some((130, 130)),
            SizeCategory::Size185x185 => Some((185, 185)),
            SizeCategory::Size250x250 => Some((250, 250)),
            SizeCategory::Size180x180 => Some((180, 180)),
            SizeCategory::Undefined | SizeCategory::Unknown0 | SizeCategory::Unknown1 => None,
        }
    }
}

impl fmt::Display for SizeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.dims() {
            Some((w, h)) => write!(f, "{}x{}", w, h),
            None => write!(f, "{:?}", self),
        }
    }
}

/// Checks the declared size category against the header's dimensions.
pub(crate) fn verify_size_category(header: &Header) -> Result<()> {
    let category = header.size_category();
    match category.dims() {
        Some(dims) if dims == (header.width(), header.height()) => Ok(()),
        Some((w, h)) => Err(Error::format_mismatch(format!(
            "size category {}x{} disagrees with dimensions {}x{}",
            w,
            h,
            header.width(),
            header.height()
        ))),
        None => Err(Error::format_mismatch(format!(
            "size category {:?} has no dimensions to verify",
            category
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_round_trip_keeps_unknown_slots() {
        let mut fields = [0u32; HEADER_FIELDS];
        for (i, field) in fields.iter_mut().enumerate() {
            *field = 0xA000_0000 | i as u32;
        }
        let header = Header::new(fields);

        let mut bytes = Vec::new();
        header.write(&mut bytes).unwrap();
        assert_eq!(bytes.len() as u64, HEADER_BYTES);

        let reloaded = Header::load(&mut &bytes[..]).unwrap();
        assert_eq!(reloaded, header);
    }

    #[test]
    fn header_accessors_hit_the_documented_slots() {
        let mut fields = [0u32; HEADER_FIELDS];
        fields[3] = 17;
        fields[5] = 3;
        fields[8] = 2;
        fields[12] = 55;
        fields[13] = 55;
        fields[18] = 7;
        fields[19] = 9;
        fields[20] = 4096;
        let header = Header::new(fields);

        assert_eq!(header.image_count(), 17);
        assert_eq!(header.data_class(), 3);
        assert_eq!(header.encoding(), Encoding::TileObject);
        assert_eq!(header.size_category(), SizeCategory::Size55x55);
        assert_eq!((header.width(), header.height()), (55, 55));
        assert_eq!((header.anchor_x(), header.anchor_y()), (7, 9));
        assert_eq!(header.data_size(), 4096);
        assert_eq!(header.preamble_size(), 88 + 5120 + 17 * 24);
    }

    #[test]
    fn entry_header_round_trip() {
        let header = EntryHeader {
            width: 30,
            height: 42,
            pos_x: 3,
            pos_y: 4,
            group: 5,
            group_size: 6,
            tile_y: 26,
            tile_orient: 1,
            h_offset: 9,
            box_width: 14,
            flags: 0x80,
        };

        let mut bytes = Vec::new();
        header.write(&mut bytes).unwrap();
        assert_eq!(bytes.len() as u64, ENTRY_HEADER_BYTES);

        let reloaded = EntryHeader::load(&mut &bytes[..]).unwrap();
        assert_eq!(reloaded, header);
    }

    #[test]
    fn data_class_mapping_is_closed() {
        assert_eq!(Encoding::from_data_class(1), Encoding::Tgx16);
        assert_eq!(Encoding::from_data_class(2), Encoding::Tgx8);
        assert_eq!(Encoding::from_data_class(3), Encoding::TileObject);
        assert_eq!(Encoding::from_data_class(4), Encoding::Font);
        assert_eq!(Encoding::from_data_class(5), Encoding::Bitmap);
        assert_eq!(Encoding::from_data_class(6), Encoding::Tgx16);
        assert_eq!(Encoding::from_data_class(7), Encoding::Bitmap);
        assert_eq!(Encoding::from_data_class(0), Encoding::Unknown);
        assert_eq!(Encoding::from_data_class(8), Encoding::Unknown);
    }

    #[test]
    fn size_category_verification() {
        let mut fields = [0u32; HEADER_FIELDS];
        fields[8] = SizeCategory::Size30x30 as u32;
        fields[12] = 30;
        fields[13] = 30;
        assert!(verify_size_category(&Header::new(fields)).is_ok());

        fields[13] = 31;
        assert!(matches!(
            verify_size_category(&Header::new(fields)),
            Err(Error::FormatMismatch(_))
        ));

        // The two unobserved slots never verify, even with zero dims.
        fields[8] = SizeCategory::Unknown0 as u32;
        fields[12] = 0;
        fields[13] = 0;
        assert!(matches!(
            verify_size_category(&Header::new(fields)),
            Err(Error::FormatMismatch(_))
        ));
    }

    #[test]
    fn size_category_by_dims() {
        assert_eq!(SizeCategory::from_dims(110, 110), SizeCategory::Size110x110);
        assert_eq!(SizeCategory::from_dims(12, 34), SizeCategory::Undefined);
        assert_eq!(SizeCategory::Size185x185.to_string(), "185x185");
        assert_eq!(SizeCategory::Unknown1.to_string(), "Unknown1");
    }
}
