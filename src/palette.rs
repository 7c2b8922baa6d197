use std::io;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::color::Color;
use crate::error::{Error, Result};
use crate::pixel_format;

/// Number of entries in every palette.
pub const PALETTE_COLORS: usize = 256;

/// A 256-entry color table. Entries are stored in the 16-bit TGX
/// encoding, exactly as they appear on disk.
#[derive(Clone, PartialEq, Eq)]
pub struct Palette {
    entries: [u16; PALETTE_COLORS],
}

impl Default for Palette {
    fn default() -> Palette {
        Palette {
            entries: [0; PALETTE_COLORS],
        }
    }
}

impl Palette {
    pub fn new(entries: [u16; PALETTE_COLORS]) -> Palette {
        Palette { entries }
    }

    pub fn load<R: io::Read>(stream: &mut R) -> Result<Palette> {
        let mut entries = [0u16; PALETTE_COLORS];
        stream
            .read_u16_into::<LittleEndian>(&mut entries)
            .map_err(eof_as_error)?;
        Ok(Palette { entries })
    }

    pub fn write<W: io::Write>(&self, stream: &mut W) -> Result<()> {
        for &entry in &self.entries {
            stream.write_u16::<LittleEndian>(entry)?;
        }
        Ok(())
    }

    /// Raw TGX16 entry.
    pub fn entry(&self, index: usize) -> Result<u16> {
        self.entries
            .get(index)
            .copied()
            .ok_or(Error::IndexOutOfRange {
                index,
                count: PALETTE_COLORS,
            })
    }

    /// Entry decoded into an RGBA color.
    pub fn color(&self, index: usize) -> Result<Color> {
        Ok(pixel_format::TGX16.unpack(self.entry(index)? as u32))
    }

    pub fn entries(&self) -> &[u16; PALETTE_COLORS] {
        &self.entries
    }
}

impl std::fmt::Debug for Palette {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Palette({:04x} {:04x} {:04x} ..)", self.entries[0], self.entries[1], self.entries[2])
    }
}

fn eof_as_error(err: io::Error) -> Error {
    if err.kind() == io::ErrorKind::UnexpectedEof {
        Error::UnexpectedEof
    } else {
        Error::Io(err)
    }
}
