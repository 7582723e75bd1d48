//! File Handle: positioned reads/writes over a file's cluster chain.
//!
//! Walks the chain one cluster at a time directly against the
//! [`SectorDevice`], since this crate keeps no cache layer (see
//! `sector.rs`).

use crate::clock::Clock;
use crate::dir::{Directory, SlotPos};
use crate::entry::DirEntry;
use crate::error::{Fat12Error, Result};
use crate::fat::FatTable;
use crate::geometry::{self, FIRST_DATA_CLUSTER};
use crate::sector::{SectorDevice, SECTOR_SIZE};

/// Maximum bytes a single file's chain can address on this geometry (spec
/// §4.7): one sector per cluster, `DATA_CLUSTER_COUNT` clusters available.
pub const MAX_FILE_SIZE: u64 = geometry::DATA_CLUSTER_COUNT as u64 * SECTOR_SIZE as u64;

/// An open file: the directory slot it lives in plus its current metadata.
/// Holding a `FileHandle` does not lock anything; it is only a
/// cursor over entry state that the caller is responsible for not using
/// concurrently with a conflicting mutation.
pub struct FileHandle {
    dir: Directory,
    pos: SlotPos,
    entry: DirEntry,
}

impl FileHandle {
    pub(crate) fn new(dir: Directory, pos: SlotPos, entry: DirEntry) -> Result<Self> {
        if entry.is_directory() {
            return Err(Fat12Error::IsADirectory(entry.name.display()));
        }
        Ok(Self { dir, pos, entry })
    }

    pub fn size(&self) -> u32 {
        self.entry.size
    }

    pub fn name(&self) -> String {
        self.entry.name.display()
    }

    /// Read the full file contents. No partial-cluster reads are exposed;
    /// the caller always gets exactly `size` bytes.
    pub fn read_all(&self, device: &dyn SectorDevice) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(self.entry.size as usize);
        if self.entry.size == 0 {
            return Ok(out);
        }
        if (self.entry.start_cluster as u32) < FIRST_DATA_CLUSTER {
            return Err(Fat12Error::CorruptDirectory(format!(
                "{} has nonzero size but no start cluster",
                self.entry.name.display()
            )));
        }

        let clusters = FatTable::walk(device, self.entry.start_cluster as u32)?;
        let mut remaining = self.entry.size as usize;
        for cluster in clusters {
            let sector = geometry::first_sector_of_cluster(cluster);
            let data = device.read_sector(sector)?;
            let take = remaining.min(SECTOR_SIZE);
            out.extend_from_slice(&data[..take]);
            remaining -= take;
            if remaining == 0 {
                break;
            }
        }
        if remaining != 0 {
            return Err(Fat12Error::CorruptDirectory(format!(
                "{} chain shorter than its recorded size",
                self.entry.name.display()
            )));
        }
        Ok(out)
    }

    /// Overwrite the file's full contents: free the existing chain (if
    /// any), allocate `ceil(len/512)` fresh clusters, write the data, and
    /// update the directory entry.
    pub fn write_all(
        &mut self,
        device: &mut dyn SectorDevice,
        data: &[u8],
        clock: &dyn Clock,
    ) -> Result<()> {
        if data.len() as u64 > MAX_FILE_SIZE {
            return Err(Fat12Error::NoSpace);
        }

        if (self.entry.start_cluster as u32) >= FIRST_DATA_CLUSTER {
            FatTable::free_chain(device, self.entry.start_cluster as u32)?;
        }

        let needed = (data.len() + SECTOR_SIZE - 1) / SECTOR_SIZE;
        let start_cluster = if needed == 0 {
            0
        } else {
            let clusters = FatTable::alloc_chain(device, needed)?;
            for (i, &cluster) in clusters.iter().enumerate() {
                let sector = geometry::first_sector_of_cluster(cluster);
                let mut buf = [0u8; SECTOR_SIZE];
                let start = i * SECTOR_SIZE;
                let end = (start + SECTOR_SIZE).min(data.len());
                buf[..end - start].copy_from_slice(&data[start..end]);
                device.write_sector(sector, &buf)?;
            }
            clusters[0]
        };

        let ts = clock.now();
        self.entry.start_cluster = start_cluster as u16;
        self.entry.size = data.len() as u32;
        self.entry.mtime = ts.time;
        self.entry.mdate = ts.date;
        self.dir.update(device, self.pos, self.entry)
    }

    /// Grow the file by appending `data` past its current end, extending
    /// the chain by one cluster at a time as needed.
    pub fn append(
        &mut self,
        device: &mut dyn SectorDevice,
        data: &[u8],
        clock: &dyn Clock,
    ) -> Result<()> {
        let mut combined = self.read_all(device)?;
        combined.extend_from_slice(data);
        self.write_all(device, &combined, clock)
    }
}
