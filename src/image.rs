//! Owned pixel buffers, scoped locking and aliasing sub-views.

use crate::color::Color;
use crate::error::{Error, Result};
use crate::palette::Palette;
use crate::pixel_format::{self, PixelFormat};
use crate::rect::Rect;

/// An owned 2D pixel buffer.
///
/// Decoders write into an `Image` through a locked view; external
/// renderers consume it by shared reference. For indexed formats a
/// [`Palette`] must be attached before any conversion to RGB.
#[derive(Clone, Debug, PartialEq)]
pub struct Image {
    width: u32,
    height: u32,
    format: PixelFormat,
    stride: usize,
    data: Vec<u8>,
    palette: Option<Palette>,
    color_key: Option<Color>,
}

impl Image {
    /// Allocates a zero-initialized image.
    pub fn new(width: u32, height: u32, format: PixelFormat) -> Result<Image> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidArgument("image dimensions must be positive"));
        }
        let stride = width as usize * format.bytes_per_pixel();
        let size = stride
            .checked_mul(height as usize)
            .ok_or(Error::ResourceExhausted("pixel buffer size overflow"))?;

        let mut data = Vec::new();
        data.try_reserve_exact(size)
            .map_err(|_| Error::ResourceExhausted("pixel buffer allocation"))?;
        data.resize(size, 0);

        Ok(Image {
            width,
            height,
            format,
            stride,
            data,
            palette: None,
            color_key: None,
        })
    }

    /// Wraps an existing byte buffer without copying it.
    pub fn from_vec(
        data: Vec<u8>,
        width: u32,
        height: u32,
        stride: usize,
        format: PixelFormat,
    ) -> Result<Image> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidArgument("image dimensions must be positive"));
        }
        if stride < width as usize * format.bytes_per_pixel() {
            return Err(Error::InvalidArgument("row stride shorter than a row"));
        }
        if data.len() < stride * height as usize {
            return Err(Error::InvalidArgument("pixel buffer shorter than the image"));
        }
        Ok(Image {
            width,
            height,
            format,
            stride,
            data,
            palette: None,
            color_key: None,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn row_stride(&self) -> usize {
        self.stride
    }

    pub fn bounds(&self) -> Rect {
        Rect::sized(self.width as i32, self.height as i32)
    }

    /// Pixels whose packed value equals `color` are skipped on blit.
    /// On indexed surfaces the key packs to index 0, the archives'
    /// transparent index.
    pub fn set_color_key(&mut self, color: Color) {
        self.color_key = Some(color);
    }

    pub fn clear_color_key(&mut self) {
        self.color_key = None;
    }

    pub fn color_key(&self) -> Option<Color> {
        self.color_key
    }

    /// Required on indexed images before conversion or blit onto an RGB
    /// target.
    pub fn attach_palette(&mut self, palette: Palette) {
        self.palette = Some(palette);
    }

    pub fn palette(&self) -> Option<&Palette> {
        self.palette.as_ref()
    }

    /// Read access to one row, `width * bytes_per_pixel` bytes.
    pub fn row(&self, y: u32) -> &[u8] {
        let start = y as usize * self.stride;
        &self.data[start..start + self.width as usize * self.format.bytes_per_pixel()]
    }

    /// Packed pixel value at a coordinate.
    pub fn pixel(&self, x: u32, y: u32) -> Result<u32> {
        if x >= self.width || y >= self.height {
            return Err(Error::InvalidArgument("coordinate out of image bounds"));
        }
        let bpp = self.format.bytes_per_pixel();
        let row = self.row(y);
        Ok(pixel_format::get_packed_pixel(&row[x as usize * bpp..(x as usize + 1) * bpp]))
    }

    /// Locks the whole image for direct pixel access. The lock is
    /// released when the guard goes out of scope, on every exit path;
    /// a second lock cannot be taken while the guard lives.
    pub fn lock(&mut self) -> ImageLocker<'_> {
        let bounds = self.bounds();
        ImageLocker {
            data: &mut self.data,
            bounds,
            stride: self.stride,
            bytes_pp: self.format.bytes_per_pixel(),
        }
    }

    /// Fills every pixel with the color packed into this image's format.
    pub fn fill(&mut self, color: Color) {
        let packed = self.format.pack(color);
        let bpp = self.format.bytes_per_pixel();
        let width = self.width as usize;
        let mut lock = self.lock();
        for y in 0..lock.height() {
            let row = lock.row_mut(y);
            for x in 0..width {
                pixel_format::set_packed_pixel(&mut row[x * bpp..(x + 1) * bpp], packed);
            }
        }
    }

    /// A mutable sub-view sharing this image's pixel memory.
    ///
    /// The view covers `normalized(clip) ∩ bounds` and inherits format,
    /// palette and color key. An empty intersection is an error.
    pub fn view_mut(&mut self, clip: Rect) -> Result<ImageView<'_>> {
        let bounds = clip.normalized().intersection(&self.bounds());
        if bounds.empty() {
            return Err(Error::InvalidArgument("view clipped to empty rectangle"));
        }
        Ok(ImageView { image: self, bounds })
    }

    /// View over the whole image.
    pub fn full_view(&mut self) -> ImageView<'_> {
        let bounds = self.bounds();
        ImageView { image: self, bounds }
    }

    /// Converts into another mask-described format, via channel masks for
    /// RGB sources and via palette lookup for indexed ones.
    pub fn convert_to(&self, format: PixelFormat) -> Result<Image> {
        if format.indexed() {
            return Err(Error::InvalidArgument("cannot convert into an indexed format"));
        }
        let mut result = Image::new(self.width, self.height, format)?;
        result.color_key = self.color_key;

        let src_bpp = self.format.bytes_per_pixel();
        let dst_bpp = format.bytes_per_pixel();
        let width = self.width as usize;

        if self.format.indexed() {
            let palette = self
                .palette
                .as_ref()
                .ok_or(Error::InvalidArgument("indexed image has no palette attached"))?;
            let mut lock = result.lock();
            for y in 0..self.height {
                let src_row = self.row(y);
                let dst_row = lock.row_mut(y as usize);
                for x in 0..width {
                    let color = palette.color(src_row[x] as usize)?;
                    let packed = format.pack(color);
                    pixel_format::set_packed_pixel(&mut dst_row[x * dst_bpp..(x + 1) * dst_bpp], packed);
                }
            }
        } else {
            let mut lock = result.lock();
            for y in 0..self.height {
                let src_row = self.row(y);
                let dst_row = lock.row_mut(y as usize);
                for x in 0..width {
                    let pixel = pixel_format::get_packed_pixel(&src_row[x * src_bpp..(x + 1) * src_bpp]);
                    let packed = format.pack(self.format.unpack(pixel));
                    pixel_format::set_packed_pixel(&mut dst_row[x * dst_bpp..(x + 1) * dst_bpp], packed);
                }
            }
        }

        Ok(result)
    }
}

/// Scoped handle granting direct access to the pixel bytes of an image
/// or view. Dropping the guard releases the lock.
pub struct ImageLocker<'a> {
    data: &'a mut [u8],
    bounds: Rect,
    stride: usize,
    bytes_pp: usize,
}

impl<'a> ImageLocker<'a> {
    pub fn width(&self) -> usize {
        self.bounds.w as usize
    }

    pub fn height(&self) -> usize {
        self.bounds.h as usize
    }

    pub fn bytes_per_pixel(&self) -> usize {
        self.bytes_pp
    }

    fn row_range(&self, y: usize) -> std::ops::Range<usize> {
        debug_assert!(y < self.height());
        let start = (self.bounds.y as usize + y) * self.stride + self.bounds.x as usize * self.bytes_pp;
        start..start + self.width() * self.bytes_pp
    }

    pub fn row(&self, y: usize) -> &[u8] {
        &self.data[self.row_range(y)]
    }

    pub fn row_mut(&mut self, y: usize) -> &mut [u8] {
        let range = self.row_range(y);
        &mut self.data[range]
    }
}

/// A rectangular sub-region aliasing its parent's pixel memory.
///
/// The borrow ties the view's lifetime to the parent: the parent cannot
/// be dropped or mutated elsewhere while a view is alive.
pub struct ImageView<'a> {
    image: &'a mut Image,
    bounds: Rect,
}

impl<'a> ImageView<'a> {
    pub fn width(&self) -> u32 {
        self.bounds.w as u32
    }

    pub fn height(&self) -> u32 {
        self.bounds.h as u32
    }

    /// Position and extent of the view inside the parent image.
    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    pub fn format(&self) -> PixelFormat {
        self.image.format()
    }

    pub fn color_key(&self) -> Option<Color> {
        self.image.color_key()
    }

    pub fn palette(&self) -> Option<&Palette> {
        self.image.palette()
    }

    /// Locks the viewed region of the parent's buffer.
    pub fn lock(&mut self) -> ImageLocker<'_> {
        ImageLocker {
            data: &mut self.image.data,
            bounds: self.bounds,
            stride: self.image.stride,
            bytes_pp: self.image.format.bytes_per_pixel(),
        }
    }
}

/// Copies a rectangle from `src` into `dst` without scaling.
///
/// `src_rect` is clipped against the source, the destination rectangle's
/// position against the target; only the overlapping part is copied. A
/// color key on the source skips matching pixels; indexed sources blitted
/// onto an RGB target go through their attached palette.
pub fn blit(src: &Image, src_rect: Rect, dst: &mut Image, dst_rect: Rect) -> Result<()> {
    let clipped = src_rect.normalized().intersection(&src.bounds());

    let mut sx = clipped.x;
    let mut sy = clipped.y;
    let mut dx = dst_rect.x;
    let mut dy = dst_rect.y;
    let mut w = clipped.w;
    let mut h = clipped.h;

    if dx < 0 {
        sx -= dx;
        w += dx;
        dx = 0;
    }
    if dy < 0 {
        sy -= dy;
        h += dy;
        dy = 0;
    }
    w = w.min(dst.width as i32 - dx);
    h = h.min(dst.height as i32 - dy);
    if w <= 0 || h <= 0 {
        return Ok(());
    }

    let src_bpp = src.format.bytes_per_pixel();
    let dst_bpp = dst.format.bytes_per_pixel();
    let key = src.color_key.map(|color| src.format.pack(color));

    if dst.format.indexed() && dst.format != src.format {
        return Err(Error::InvalidArgument("cannot blit into an indexed image"));
    }
    let palette = if src.format.indexed() && !dst.format.indexed() {
        Some(
            src.palette
                .as_ref()
                .ok_or(Error::InvalidArgument("indexed image has no palette attached"))?,
        )
    } else {
        None
    };

    let src_format = src.format;
    let dst_format = dst.format;
    let mut lock = dst.lock();

    for y in 0..h as usize {
        let src_row = src.row((sy + y as i32) as u32);
        let dst_row = lock.row_mut((dy as usize) + y);
        for x in 0..w as usize {
            let src_at = (sx as usize + x) * src_bpp;
            let pixel = pixel_format::get_packed_pixel(&src_row[src_at..src_at + src_bpp]);
            if key == Some(pixel) {
                continue;
            }
            let packed = if let Some(palette) = &palette {
                dst_format.pack(palette.color(pixel as usize)?)
            } else if src_format == dst_format {
                pixel
            } else {
                dst_format.pack(src_format.unpack(pixel))
            };
            let dst_at = (dx as usize + x) * dst_bpp;
            pixel_format::set_packed_pixel(&mut dst_row[dst_at..dst_at + dst_bpp], packed);
        }
    }

    Ok(())
}
