//! Pluggable output formats for the `render` mode.

use std::io::{self, Write};

use gm1::{tgx, Error, Image, Result, TGX16};

/// Renders a decoded image into some on-disk container.
pub trait Render {
    fn name(&self) -> &'static str;

    /// Writes the image and reports the number of bytes written.
    fn render(&self, out: &mut dyn Write, image: &Image) -> Result<u64>;
}

/// Every built-in format, in default-first order.
pub fn formats() -> Vec<Box<dyn Render>> {
    let mut formats: Vec<Box<dyn Render>> = vec![Box::new(BmpFormat), Box::new(TgxFormat)];
    #[cfg(feature = "png")]
    formats.push(Box::new(PngFormat));
    formats
}

struct CountingWriter<'a> {
    inner: &'a mut dyn Write,
    written: u64,
}

impl<'a> CountingWriter<'a> {
    fn new(inner: &'a mut dyn Write) -> CountingWriter<'a> {
        CountingWriter { inner, written: 0 }
    }
}

impl Write for CountingWriter<'_> {
    fn write(&mut self, buffer: &[u8]) -> io::Result<usize> {
        let written = self.inner.write(buffer)?;
        self.written += written as u64;
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Uncompressed bottom-up BMP; 24 bpp for alpha-less images, 32 bpp
/// otherwise.
pub struct BmpFormat;

impl Render for BmpFormat {
    fn name(&self) -> &'static str {
        "bmp"
    }

    fn render(&self, out: &mut dyn Write, image: &Image) -> Result<u64> {
        let format = image.format();
        if format.indexed() {
            return Err(Error::InvalidArgument(
                "convert indexed images through their palette before rendering",
            ));
        }

        let width = image.width();
        let height = image.height();
        let bytes_pp: usize = if format.has_alpha() { 4 } else { 3 };
        let row_size = (width as usize * bytes_pp + 3) & !3;
        let data_size = row_size * height as usize;
        let file_size = 14 + 40 + data_size;

        let mut counter = CountingWriter::new(out);

        // BITMAPFILEHEADER
        counter.write_all(b"BM")?;
        counter.write_all(&(file_size as u32).to_le_bytes())?;
        counter.write_all(&[0; 4])?;
        counter.write_all(&(14u32 + 40).to_le_bytes())?;

        // BITMAPINFOHEADER
        counter.write_all(&40u32.to_le_bytes())?;
        counter.write_all(&(width as i32).to_le_bytes())?;
        counter.write_all(&(height as i32).to_le_bytes())?; // positive: bottom-up
        counter.write_all(&1u16.to_le_bytes())?;
        counter.write_all(&((bytes_pp * 8) as u16).to_le_bytes())?;
        counter.write_all(&0u32.to_le_bytes())?; // BI_RGB
        counter.write_all(&(data_size as u32).to_le_bytes())?;
        counter.write_all(&2835i32.to_le_bytes())?;
        counter.write_all(&2835i32.to_le_bytes())?;
        counter.write_all(&0u32.to_le_bytes())?;
        counter.write_all(&0u32.to_le_bytes())?;

        let mut row = vec![0u8; row_size];
        for y in (0..height).rev() {
            for x in 0..width {
                let color = format.unpack(image.pixel(x, y)?);
                let at = x as usize * bytes_pp;
                row[at] = color.b;
                row[at + 1] = color.g;
                row[at + 2] = color.r;
                if bytes_pp == 4 {
                    row[at + 3] = color.a;
                }
            }
            counter.write_all(&row)?;
        }

        Ok(counter.written)
    }
}

/// The crate's own codec as an output container.
pub struct TgxFormat;

impl Render for TgxFormat {
    fn name(&self) -> &'static str {
        "tgx"
    }

    fn render(&self, out: &mut dyn Write, image: &Image) -> Result<u64> {
        let mut counter = CountingWriter::new(out);
        if image.format() == TGX16 {
            tgx::write_tgx(&mut counter, image)?;
        } else {
            tgx::write_tgx(&mut counter, &image.convert_to(TGX16)?)?;
        }
        Ok(counter.written)
    }
}

#[cfg(feature = "png")]
pub struct PngFormat;

#[cfg(feature = "png")]
impl Render for PngFormat {
    fn name(&self) -> &'static str {
        "png"
    }

    fn render(&self, out: &mut dyn Write, image: &Image) -> Result<u64> {
        use image::codecs::png::PngEncoder;
        use image::{ExtendedColorType, ImageEncoder};

        let format = image.format();
        if format.indexed() {
            return Err(Error::InvalidArgument(
                "convert indexed images through their palette before rendering",
            ));
        }

        let mut rgba = Vec::with_capacity(image.width() as usize * image.height() as usize * 4);
        for y in 0..image.height() {
            for x in 0..image.width() {
                let color = format.unpack(image.pixel(x, y)?);
                rgba.extend_from_slice(&[color.r, color.g, color.b, color.a]);
            }
        }

        let mut counter = CountingWriter::new(out);
        PngEncoder::new(&mut counter)
            .write_image(&rgba, image.width(), image.height(), ExtendedColorType::Rgba8)
            .map_err(|err| Error::Io(io::Error::new(io::ErrorKind::Other, err.to_string())))?;
        Ok(counter.written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gm1::{colors, ARGB8888};

    fn sample() -> Image {
        let mut image = Image::new(2, 2, ARGB8888).unwrap();
        image.fill(colors::MAGENTA);
        image
    }

    #[test]
    fn bmp_layout() {
        let image = sample();
        let mut bytes = Vec::new();
        let written = BmpFormat.render(&mut bytes, &image).unwrap();

        assert_eq!(written, bytes.len() as u64);
        assert_eq!(&bytes[0..2], b"BM");
        // 32 bpp: 2x2 pixels, no padding.
        assert_eq!(bytes.len(), 14 + 40 + 16);
        assert_eq!(u32::from_le_bytes(bytes[2..6].try_into().unwrap()), bytes.len() as u32);

        // Bottom-up rows of B, G, R, A.
        assert_eq!(&bytes[54..58], &[255, 0, 255, 255]);
    }

    #[test]
    fn bmp_pads_24bpp_rows() {
        let rgb888 = gm1::PixelFormat::with_masks(24, 0xFF0000, 0x00FF00, 0x0000FF, 0);
        let mut image = Image::new(3, 1, rgb888).unwrap();
        image.fill(colors::WHITE);

        let mut bytes = Vec::new();
        BmpFormat.render(&mut bytes, &image).unwrap();
        // Three 3-byte pixels round up to a 12-byte row.
        assert_eq!(bytes.len(), 54 + 12);
        assert_eq!(u16::from_le_bytes(bytes[28..30].try_into().unwrap()), 24);
        assert_eq!(&bytes[54..57], &[255, 255, 255]);
        assert_eq!(&bytes[63..66], &[0, 0, 0]);
    }

    #[test]
    fn tgx_format_reads_back() {
        let image = sample();
        let mut bytes = Vec::new();
        let written = TgxFormat.render(&mut bytes, &image).unwrap();
        assert_eq!(written, bytes.len() as u64);

        let mut cursor = std::io::Cursor::new(&bytes[..]);
        let decoded = gm1::tgx::read_tgx(&mut cursor).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (2, 2));
        assert_eq!(decoded.pixel(0, 0).unwrap(), 0xFC1F);
    }

    #[test]
    fn format_registry_has_unique_names() {
        let formats = formats();
        assert_eq!(formats[0].name(), "bmp");
        for (i, a) in formats.iter().enumerate() {
            for b in &formats[i + 1..] {
                assert_ne!(a.name(), b.name());
            }
        }
    }
}
