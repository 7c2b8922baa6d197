//! TGX: the run-length-encoded pixel stream of Stronghold assets.
//!
//! A TGX stream is a sequence of one-byte tokens, each carrying a kind in
//! the upper three bits and a length minus one in the lower five. Stream
//! tokens are followed by `length` literal pixels, Repeat tokens by one
//! pixel expanded `length` times, Transparent tokens skip pixels without
//! payload and a LineFeed ends the current row. Standalone `.tgx` files
//! prepend a little-endian `width`/`height` pair to the token stream.

use std::io;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::error::{Error, Result};
use crate::image::{Image, ImageView};
use crate::pixel_format::TGX16;
use crate::stream::Bounded;

/// Tokens cannot span more than 32 pixels.
pub const MAX_TOKEN_LENGTH: usize = 32;

/// The transparent sentinel of 16-bit streams: black with the
/// transparency bit clear.
pub const TRANSPARENT16: u16 = 0x0000;

/// Dimension cap for standalone TGX files; anything larger is corrupt.
const MAX_TGX_WIDTH: u32 = 4096;
const MAX_TGX_HEIGHT: u32 = 4096;

/// Width and height of the isometric tile rhombus.
pub const TILE_WIDTH: u32 = 30;
pub const TILE_HEIGHT: u32 = 16;

/// Encoded size of one tile: 256 pixels at 2 bytes each, row-compacted.
pub const TILE_BYTES: u64 = 512;

/// Pixels per rhombus row; rows are centered in the 30-pixel width.
pub const TILE_PIXELS_PER_ROW: [usize; TILE_HEIGHT as usize] =
    [2, 6, 10, 14, 18, 22, 26, 30, 30, 26, 22, 18, 14, 10, 6, 2];

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum TokenKind {
    Stream,
    Transparent,
    Repeat,
    LineFeed,
}

fn token_kind(token: u8) -> Option<TokenKind> {
    match token >> 5 {
        0 => Some(TokenKind::Stream),
        1 => Some(TokenKind::Transparent),
        2 => Some(TokenKind::Repeat),
        4 => Some(TokenKind::LineFeed),
        _ => None,
    }
}

/// There is no zero length; the wire value is length minus one.
fn token_length(token: u8) -> usize {
    (token & 0x1F) as usize + 1
}

fn make_token(kind: TokenKind, length: usize) -> u8 {
    let kind = match kind {
        TokenKind::Stream => 0u8,
        TokenKind::Transparent => 1,
        TokenKind::Repeat => 2,
        TokenKind::LineFeed => 4,
    };
    (kind << 5) | ((length - 1) as u8 & 0x1F)
}

/// Decodes tokens into one row until a LineFeed or the end of the byte
/// budget. `row` must be exactly `width * bytes_per_pixel` bytes.
fn decode_row<R: io::Read>(src: &mut Bounded<R>, row: &mut [u8], bytes_pp: usize) -> Result<()> {
    let mut at = 0;

    while src.remaining() > 0 {
        let token = src.read_u8()?;
        let kind = token_kind(token).ok_or(Error::MalformedStream("unknown token"))?;
        let length = token_length(token);

        if kind == TokenKind::LineFeed {
            if length != 1 {
                return Err(Error::MalformedStream("inconsistent line feed"));
            }
            return Ok(());
        }

        let bytes = length * bytes_pp;
        if at + bytes > row.len() {
            return Err(Error::MalformedStream("row overflow"));
        }

        match kind {
            TokenKind::Stream => {
                src.read_exact(&mut row[at..at + bytes])?;
            }
            TokenKind::Repeat => {
                let mut pixel = [0u8; 4];
                src.read_exact(&mut pixel[..bytes_pp])?;
                for n in 0..length {
                    row[at + n * bytes_pp..at + (n + 1) * bytes_pp]
                        .copy_from_slice(&pixel[..bytes_pp]);
                }
            }
            TokenKind::Transparent => {}
            TokenKind::LineFeed => unreachable!(),
        }

        at += bytes;
    }

    // The budget ran out exactly at a row boundary; the row is done.
    Ok(())
}

/// Decodes `num_bytes` of token stream into the target view, row by row.
/// Untouched pixels keep their prior value; surplus bytes after the last
/// row are consumed so the stream ends up at the declared segment end.
pub fn decode_image<R: io::Read>(
    stream: &mut R,
    num_bytes: u64,
    target: &mut ImageView<'_>,
) -> Result<()> {
    let bytes_pp = target.format().bytes_per_pixel();
    let mut src = Bounded::new(stream, num_bytes);

    let mut lock = target.lock();
    for y in 0..lock.height() {
        if src.remaining() == 0 {
            break;
        }
        decode_row(&mut src, lock.row_mut(y), bytes_pp)?;
    }
    drop(lock);

    src.skip_to_end()
}

fn pixels_equal(row: &[u8], a: usize, b: usize, bytes_pp: usize) -> bool {
    row[a..a + bytes_pp] == row[b..b + bytes_pp]
}

fn write_stream_token<W: io::Write>(out: &mut W, pixels: &[u8], bytes_pp: usize) -> Result<()> {
    out.write_u8(make_token(TokenKind::Stream, pixels.len() / bytes_pp))?;
    out.write_all(pixels)?;
    Ok(())
}

fn write_repeat_token<W: io::Write>(out: &mut W, pixel: &[u8], count: usize) -> Result<()> {
    // A run of the transparent sentinel needs no payload pixel.
    if pixel == TRANSPARENT16.to_le_bytes().as_slice() {
        out.write_u8(make_token(TokenKind::Transparent, count))?;
        return Ok(());
    }
    out.write_u8(make_token(TokenKind::Repeat, count))?;
    out.write_all(pixel)?;
    Ok(())
}

fn write_line_feed<W: io::Write>(out: &mut W) -> Result<()> {
    out.write_u8(make_token(TokenKind::LineFeed, 1))?;
    Ok(())
}

/// Encodes one row as a token stream followed by a LineFeed.
///
/// Two windows grow over the row: the pending stream of unlike pixels and
/// the repeat run that begins at the last pixel transition. A repeat of at
/// least two pixels is emitted as a Repeat token (after flushing the
/// stream prefix ahead of it); shorter runs fold into the stream. Runs of
/// the transparent sentinel shrink into payload-free Transparent tokens.
pub fn encode_row<W: io::Write>(out: &mut W, row: &[u8], bytes_pp: usize) -> Result<()> {
    debug_assert_eq!(row.len() % bytes_pp, 0);

    let end = row.len();
    let mut pos = 0;
    let mut stream_start = 0;
    let mut repeat_start = 0;

    while pos != end {
        if (pos - stream_start) / bytes_pp == MAX_TOKEN_LENGTH {
            if stream_start != repeat_start {
                write_stream_token(out, &row[stream_start..repeat_start], bytes_pp)?;
                stream_start = repeat_start;
            } else {
                // Both windows coincide, so the window is one uniform run.
                write_repeat_token(out, &row[stream_start..stream_start + bytes_pp], MAX_TOKEN_LENGTH)?;
                stream_start = pos;
                repeat_start = pos;
            }
        }

        if !pixels_equal(row, repeat_start, pos, bytes_pp) {
            let num_repeat = (pos - repeat_start) / bytes_pp;
            if num_repeat >= 2 {
                if repeat_start > stream_start {
                    write_stream_token(out, &row[stream_start..repeat_start], bytes_pp)?;
                }
                write_repeat_token(out, &row[repeat_start..repeat_start + bytes_pp], num_repeat)?;
                stream_start = pos;
            }
            repeat_start = pos;
        }

        pos += bytes_pp;
    }

    let num_stream = (pos - stream_start) / bytes_pp;
    let num_repeat = (pos - repeat_start) / bytes_pp;

    if num_repeat >= 2 {
        if num_stream > num_repeat {
            write_stream_token(out, &row[stream_start..repeat_start], bytes_pp)?;
        }
        write_repeat_token(out, &row[repeat_start..repeat_start + bytes_pp], num_repeat)?;
    } else if num_stream != 0 {
        write_stream_token(out, &row[stream_start..pos], bytes_pp)?;
    }

    write_line_feed(out)
}

/// Encodes every row of an image.
pub fn encode_image<W: io::Write>(out: &mut W, image: &Image) -> Result<()> {
    let bytes_pp = image.format().bytes_per_pixel();
    for y in 0..image.height() {
        encode_row(out, image.row(y), bytes_pp)?;
    }
    Ok(())
}

/// Decodes the 30×16 tile rhombus: raw pixels, no tokens, each row
/// centered in the 30-pixel width. Pixels outside the rhombus keep their
/// prior value.
pub fn decode_tile<R: io::Read>(stream: &mut R, target: &mut ImageView<'_>) -> Result<()> {
    if target.width() < TILE_WIDTH || target.height() < TILE_HEIGHT {
        return Err(Error::InvalidArgument("tile target smaller than the rhombus"));
    }
    let bytes_pp = target.format().bytes_per_pixel();
    let mut src = Bounded::new(stream, TILE_BYTES);

    let mut lock = target.lock();
    for y in 0..TILE_HEIGHT as usize {
        let length = TILE_PIXELS_PER_ROW[y];
        let offset = (TILE_WIDTH as usize - length) / 2;
        let row = lock.row_mut(y);
        src.read_exact(&mut row[offset * bytes_pp..(offset + length) * bytes_pp])?;
    }

    Ok(())
}

/// Mirror of [`decode_tile`]: emits the 512-byte compacted form of the
/// 30×16 region of `image` whose top-left corner is `(x, y)`.
pub fn encode_tile<W: io::Write>(out: &mut W, image: &Image, x: u32, y: u32) -> Result<()> {
    if x + TILE_WIDTH > image.width() || y + TILE_HEIGHT > image.height() {
        return Err(Error::InvalidArgument("tile region out of image bounds"));
    }
    let bytes_pp = image.format().bytes_per_pixel();

    for row in 0..TILE_HEIGHT as usize {
        let length = TILE_PIXELS_PER_ROW[row];
        let offset = x as usize + (TILE_WIDTH as usize - length) / 2;
        let bytes = &image.row(y + row as u32)[offset * bytes_pp..(offset + length) * bytes_pp];
        out.write_all(bytes)?;
    }

    Ok(())
}

/// Reads a standalone TGX file: 8-byte header, then tokens until the end
/// of the stream. The result is a TGX16 image.
pub fn read_tgx<R: io::Read + io::Seek>(stream: &mut R) -> Result<Image> {
    let width = stream.read_u32::<LittleEndian>()?;
    let height = stream.read_u32::<LittleEndian>()?;
    if width > MAX_TGX_WIDTH || height > MAX_TGX_HEIGHT {
        return Err(Error::format_mismatch(format!(
            "tgx dimensions {}x{} out of range",
            width, height
        )));
    }

    let origin = stream.stream_position()?;
    let end = stream.seek(io::SeekFrom::End(0))?;
    stream.seek(io::SeekFrom::Start(origin))?;

    let mut image = Image::new(width, height, TGX16)?;
    decode_image(stream, end - origin, &mut image.full_view())?;
    Ok(image)
}

/// Writes a standalone TGX file.
pub fn write_tgx<W: io::Write>(out: &mut W, image: &Image) -> Result<()> {
    out.write_u32::<LittleEndian>(image.width())?;
    out.write_u32::<LittleEndian>(image.height())?;
    encode_image(out, image)
}
