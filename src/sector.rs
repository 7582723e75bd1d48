//! Sector Buffer: the fixed-size, sector-addressed byte image.
//!
//! No cache layer sits in front of this image: at 1.44 MB it is always
//! fully resident in memory, so there is no slow backing device to cache
//! reads against. See DESIGN.md.

use std::fs;
use std::path::Path;

use crate::error::{Fat12Error, Result};

pub const SECTOR_SIZE: usize = 512;
pub const SECTOR_COUNT: usize = 2_880;
pub const IMAGE_SIZE: usize = SECTOR_SIZE * SECTOR_COUNT;

/// A sector-addressable byte store. The engine never assumes more about its
/// backing than this contract; [`Image`] is the only implementor this crate
/// ships, but callers may supply their own (e.g. a memory-mapped file).
pub trait SectorDevice {
    fn read_sector(&self, n: usize) -> Result<[u8; SECTOR_SIZE]>;
    fn write_sector(&mut self, n: usize, data: &[u8]) -> Result<()>;
    fn sector_count(&self) -> usize;
}

/// A 1,474,560-byte in-memory floppy image, addressed as 2,880 sectors.
#[derive(Clone)]
pub struct Image {
    bytes: Box<[u8; IMAGE_SIZE]>,
}

impl Image {
    /// A blank image of all zero bytes. Callers still need to `format` it
    /// before it is a valid FAT12 volume.
    pub fn new_blank() -> Self {
        Self {
            bytes: vec![0u8; IMAGE_SIZE].into_boxed_slice().try_into().unwrap(),
        }
    }

    /// Load a raw floppy image from disk. Fails `BadImage` if the file
    /// length is not exactly 1,474,560 bytes.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let data = fs::read(path.as_ref())
            .map_err(|e| Fat12Error::BadImage(format!("read failed: {e}")))?;
        if data.len() != IMAGE_SIZE {
            return Err(Fat12Error::BadImage(format!(
                "expected {IMAGE_SIZE} bytes, found {}",
                data.len()
            )));
        }
        let bytes: Box<[u8; IMAGE_SIZE]> = data.into_boxed_slice().try_into().unwrap();
        Ok(Self { bytes })
    }

    /// Serialize the current buffer to disk in one pass: a monotone
    /// snapshot of the buffer at this point in time.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        fs::write(path.as_ref(), self.bytes.as_slice())
            .map_err(|e| Fat12Error::BadImage(format!("write failed: {e}")))
    }
}

impl SectorDevice for Image {
    fn read_sector(&self, n: usize) -> Result<[u8; SECTOR_SIZE]> {
        if n >= SECTOR_COUNT {
            return Err(Fat12Error::OutOfRange(n));
        }
        let start = n * SECTOR_SIZE;
        let mut out = [0u8; SECTOR_SIZE];
        out.copy_from_slice(&self.bytes[start..start + SECTOR_SIZE]);
        Ok(out)
    }

    fn write_sector(&mut self, n: usize, data: &[u8]) -> Result<()> {
        if n >= SECTOR_COUNT {
            return Err(Fat12Error::OutOfRange(n));
        }
        if data.len() != SECTOR_SIZE {
            return Err(Fat12Error::BadSize {
                expected: SECTOR_SIZE,
                actual: data.len(),
            });
        }
        let start = n * SECTOR_SIZE;
        self.bytes[start..start + SECTOR_SIZE].copy_from_slice(data);
        Ok(())
    }

    fn sector_count(&self) -> usize {
        SECTOR_COUNT
    }
}
