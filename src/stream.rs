//! Little-endian reading bounded to a declared byte segment.

use std::io;
use std::io::Read;

use byteorder::{LittleEndian, ReadBytesExt};

use crate::error::{Error, Result};

/// Wraps a byte stream and refuses to read past a declared segment end.
///
/// The codecs never trust a stream's physical end: every TGX payload and
/// archive region declares its length up front, and overrunning it is a
/// parse error ([`Error::UnexpectedEof`]), while the underlying source
/// running dry earlier than declared is an I/O error.
pub struct Bounded<R> {
    inner: R,
    remaining: u64,
}

impl<R: io::Read> Bounded<R> {
    pub fn new(inner: R, len: u64) -> Bounded<R> {
        Bounded {
            inner,
            remaining: len,
        }
    }

    /// Bytes left before the declared segment end.
    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    fn take(&mut self, bytes: u64) -> Result<()> {
        if bytes > self.remaining {
            return Err(Error::UnexpectedEof);
        }
        self.remaining -= bytes;
        Ok(())
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        self.take(1)?;
        Ok(self.inner.read_u8()?)
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        self.take(2)?;
        Ok(self.inner.read_u16::<LittleEndian>()?)
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        self.take(4)?;
        Ok(self.inner.read_u32::<LittleEndian>()?)
    }

    pub fn read_exact(&mut self, buffer: &mut [u8]) -> Result<()> {
        self.take(buffer.len() as u64)?;
        self.inner.read_exact(buffer)?;
        Ok(())
    }

    /// Consumes and discards everything up to the segment end.
    pub fn skip_to_end(&mut self) -> Result<()> {
        let mut sink = io::sink();
        let skipped = io::copy(&mut (&mut self.inner).take(self.remaining), &mut sink)?;
        if skipped < self.remaining {
            self.remaining -= skipped;
            return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into());
        }
        self.remaining = 0;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_inside_the_segment() {
        let data = [0x01u8, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08];
        let mut bounded = Bounded::new(&data[..], 7);

        assert_eq!(bounded.read_u8().unwrap(), 0x01);
        assert_eq!(bounded.read_u16().unwrap(), 0x0302);
        assert_eq!(bounded.read_u32().unwrap(), 0x07060504);
        assert_eq!(bounded.remaining(), 0);
    }

    #[test]
    fn refuses_to_cross_the_segment_end() {
        let data = [0u8; 8];
        let mut bounded = Bounded::new(&data[..], 3);

        assert_eq!(bounded.read_u16().unwrap(), 0);
        // One byte left; a u16 would cross the boundary.
        assert!(matches!(bounded.read_u16(), Err(Error::UnexpectedEof)));
        // The failed read consumed nothing.
        assert_eq!(bounded.remaining(), 1);
        assert_eq!(bounded.read_u8().unwrap(), 0);
    }

    #[test]
    fn truncated_source_is_an_io_error() {
        let data = [0u8; 2];
        let mut bounded = Bounded::new(&data[..], 10);
        assert!(matches!(bounded.read_u32(), Err(Error::Io(_))));
    }

    #[test]
    fn skip_to_end_discards_the_rest() {
        let data = [1u8, 2, 3, 4, 5];
        let mut stream = &data[..];
        {
            let mut bounded = Bounded::new(&mut stream, 3);
            assert_eq!(bounded.read_u8().unwrap(), 1);
            bounded.skip_to_end().unwrap();
            assert_eq!(bounded.remaining(), 0);
        }
        // The bytes after the segment are still there.
        assert_eq!(stream, &[4, 5]);
    }
}
