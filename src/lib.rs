//! Library for reading & writing the TGX image format and GM1 sprite
//! archives of Stronghold Crusader.
//!

// References:
// https://github.com/sourcehold/sourcehold-maps
// https://stronghold.fandom.com/wiki/Graphics_file_formats
// Both formats are little-endian throughout. TGX is a run-length token
// stream of 16-bit (or palette-indexed 8-bit) pixels; GM1 is a container
// of ten palettes plus TGX-encoded entries with tile geometry.

pub use color::{colors, Color};
pub use error::{Error, Result};
pub use header::{
    data_class_name, Encoding, EntryHeader, Header, SizeCategory, TGX8_TRANSPARENT_INDEX,
};
pub use image::{blit, Image, ImageLocker, ImageView};
pub use palette::{Palette, PALETTE_COLORS};
pub use pixel_format::{PixelFormat, ARGB8888, INDEXED8, TGX16};
pub use reader::{OpenFlags, Reader};
pub use rect::Rect;
pub use writer::{write_archive, write_header, write_palette, ArchiveEntry};

pub mod color;
pub mod error;
pub mod header;
pub mod image;
pub mod palette;
pub mod pixel_format;
pub mod reader;
pub mod rect;
pub mod stream;
pub mod tgx;
pub mod writer;
