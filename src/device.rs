//! Block-device collaborator used by the superblock reader.
//!
//! The reader needs exactly two things from a device: its block size and the
//! ability to read whole blocks by index. Anything that can provide those
//! (a kernel block device, a loop image, an in-memory buffer) implements
//! [`BlockDevice`].

use std::io::{self, Read, Seek, SeekFrom};

/// Sector-addressed read access to a block device.
pub trait BlockDevice {
    /// Block size in bytes reported by the device.
    fn block_size(&mut self) -> io::Result<usize>;

    /// Read `count` blocks starting at block `blkno` into `buf`.
    ///
    /// `buf` must be at least `count * block_size()` bytes long.
    fn get(&mut self, blkno: u64, buf: &mut [u8], count: usize) -> io::Result<()>;
}

/// A [`BlockDevice`] over any seekable byte stream with a fixed block size.
///
/// Typical inners are a `File` opened on an image or a device node, or a
/// `Cursor<Vec<u8>>` in tests.
#[derive(Debug)]
pub struct StreamDevice<R> {
    inner: R,
    block_size: usize,
}

impl<R: Read + Seek> StreamDevice<R> {
    pub fn new(inner: R, block_size: usize) -> Self {
        Self { inner, block_size }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read + Seek> BlockDevice for StreamDevice<R> {
    fn block_size(&mut self) -> io::Result<usize> {
        Ok(self.block_size)
    }

    fn get(&mut self, blkno: u64, buf: &mut [u8], count: usize) -> io::Result<()> {
        let len = count
            .checked_mul(self.block_size)
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "read length overflow"))?;
        if buf.len() < len {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("buffer of {} bytes cannot hold {} blocks", buf.len(), count),
            ));
        }
        let offset = blkno
            .checked_mul(self.block_size as u64)
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "block offset overflow"))?;
        self.inner.seek(SeekFrom::Start(offset))?;
        self.inner.read_exact(&mut buf[..len])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn reads_whole_blocks_by_index() {
        let mut image = vec![0u8; 2048];
        image[1024..1536].fill(0xab);
        let mut dev = StreamDevice::new(Cursor::new(image), 512);

        let mut buf = [0u8; 512];
        dev.get(2, &mut buf, 1).unwrap();
        assert!(buf.iter().all(|&b| b == 0xab));
        dev.get(1, &mut buf, 1).unwrap();
        assert!(buf.iter().all(|&b| b == 0));
    }

    #[test]
    fn read_past_end_fails() {
        let mut dev = StreamDevice::new(Cursor::new(vec![0u8; 512]), 512);
        let mut buf = [0u8; 512];
        let err = dev.get(1, &mut buf, 1).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn short_buffer_is_rejected() {
        let mut dev = StreamDevice::new(Cursor::new(vec![0u8; 1024]), 512);
        let mut buf = [0u8; 100];
        let err = dev.get(0, &mut buf, 1).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }
}
