//! Directory: the logical view over a root directory's fixed sectors or a
//! sub-directory's cluster chain.
//!
//! The two storage shapes (fixed root region vs. cluster-chained
//! sub-directory) share every operation below except how their backing
//! sectors are enumerated and how they grow when full.

use crate::entry::{Attributes, DirEntry, Slot, ShortName, ENTRY_SIZE};
use crate::error::{Fat12Error, Result};
use crate::fat::FatTable;
use crate::geometry::{self, ROOT_DIR_SECTOR, ROOT_DIR_SECTORS};
use crate::sector::{SectorDevice, SECTOR_SIZE};

const SLOTS_PER_SECTOR: usize = SECTOR_SIZE / ENTRY_SIZE;

/// Where a directory's slots live on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirLocation {
    /// Fixed 14 sectors at sectors 19-32, not cluster-chained.
    Root,
    /// A cluster chain; `start_cluster` is this directory's own first
    /// cluster (stored in its `.` entry and in its parent's entry for it).
    Sub { start_cluster: u32 },
}

/// The position of one slot within a directory, opaque to callers beyond
/// round-tripping it back into [`Directory`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotPos {
    sector: usize,
    offset: usize,
}

/// A logical view over one directory's slots.
pub struct Directory {
    pub location: DirLocation,
}

impl Directory {
    pub fn root() -> Self {
        Self {
            location: DirLocation::Root,
        }
    }

    pub fn sub(start_cluster: u32) -> Self {
        Self {
            location: DirLocation::Sub { start_cluster },
        }
    }

    /// The ordered list of sectors backing this directory's slots.
    fn sectors(&self, device: &dyn SectorDevice) -> Result<Vec<usize>> {
        match self.location {
            DirLocation::Root => Ok((ROOT_DIR_SECTOR..ROOT_DIR_SECTOR + ROOT_DIR_SECTORS as usize).collect()),
            DirLocation::Sub { start_cluster } => Ok(FatTable::walk(device, start_cluster)?
                .into_iter()
                .map(geometry::first_sector_of_cluster)
                .collect()),
        }
    }

    fn read_slot(device: &dyn SectorDevice, pos: SlotPos) -> Result<[u8; ENTRY_SIZE]> {
        let sector = device.read_sector(pos.sector)?;
        let mut out = [0u8; ENTRY_SIZE];
        out.copy_from_slice(&sector[pos.offset..pos.offset + ENTRY_SIZE]);
        Ok(out)
    }

    fn write_slot(device: &mut dyn SectorDevice, pos: SlotPos, bytes: &[u8; ENTRY_SIZE]) -> Result<()> {
        let mut sector = device.read_sector(pos.sector)?;
        sector[pos.offset..pos.offset + ENTRY_SIZE].copy_from_slice(bytes);
        device.write_sector(pos.sector, &sector)
    }

    /// Every slot position this directory currently spans, in on-disk
    /// order.
    fn all_positions(&self, device: &dyn SectorDevice) -> Result<Vec<SlotPos>> {
        let mut positions = Vec::new();
        for sector in self.sectors(device)? {
            for slot in 0..SLOTS_PER_SECTOR {
                positions.push(SlotPos {
                    sector,
                    offset: slot * ENTRY_SIZE,
                });
            }
        }
        Ok(positions)
    }

    /// Validate that a non-root directory opens with the `.`/`..` pair as
    /// its first two entries.
    fn check_dot_entries(&self, device: &dyn SectorDevice) -> Result<()> {
        if matches!(self.location, DirLocation::Root) {
            return Ok(());
        }
        let positions = self.all_positions(device)?;
        if positions.len() < 2 {
            return Err(Fat12Error::CorruptDirectory("directory has no slots".into()));
        }
        for (i, expected) in [(0, "."), (1, "..")] {
            match DirEntry::parse(&Self::read_slot(device, positions[i])?) {
                Slot::Live(e) if e.name.display().trim_end() == expected || e.name.display() == expected => {}
                _ => {
                    return Err(Fat12Error::CorruptDirectory(format!(
                        "slot {i} is not the expected {expected:?} entry"
                    )))
                }
            }
        }
        Ok(())
    }

    /// Live `(slot position, entry)` pairs, skipping LFN/deleted slots and
    /// stopping at the first never-used slot.
    pub fn iter(&self, device: &dyn SectorDevice) -> Result<Vec<(SlotPos, DirEntry)>> {
        self.check_dot_entries(device)?;
        let mut out = Vec::new();
        for pos in self.all_positions(device)? {
            match DirEntry::parse(&Self::read_slot(device, pos)?) {
                Slot::NeverUsed => break,
                Slot::Deleted | Slot::LfnSkip => continue,
                Slot::Live(e) => out.push((pos, e)),
            }
        }
        Ok(out)
    }

    /// Live entries excluding the synthetic `.`/`..` pair, for user-facing
    /// listings.
    pub fn iter_visible(&self, device: &dyn SectorDevice) -> Result<Vec<(SlotPos, DirEntry)>> {
        let all = self.iter(device)?;
        match self.location {
            DirLocation::Root => Ok(all),
            DirLocation::Sub { .. } => Ok(all.into_iter().skip(2).collect()),
        }
    }

    pub fn lookup(&self, device: &dyn SectorDevice, name: &ShortName) -> Result<Option<(SlotPos, DirEntry)>> {
        Ok(self
            .iter(device)?
            .into_iter()
            .find(|(_, e)| e.name == *name))
    }

    /// Insert `entry`, reusing the first `0x00`/`0xE5` slot. Extends a
    /// sub-directory's chain by one cluster if none is free; fails
    /// `DirFull` for the root.
    pub fn insert(&self, device: &mut dyn SectorDevice, entry: DirEntry) -> Result<SlotPos> {
        self.check_dot_entries(device)?;
        if self.lookup(device, &entry.name)?.is_some() {
            return Err(Fat12Error::Exists(entry.name.display()));
        }

        for pos in self.all_positions(device)? {
            match DirEntry::parse(&Self::read_slot(device, pos)?) {
                Slot::NeverUsed | Slot::Deleted => {
                    Self::write_slot(device, pos, &entry.serialize())?;
                    return Ok(pos);
                }
                _ => continue,
            }
        }

        match self.location {
            DirLocation::Root => Err(Fat12Error::DirFull),
            DirLocation::Sub { start_cluster } => {
                let new_clusters = FatTable::extend(device, start_cluster, 1)?;
                let new_cluster = new_clusters[0];
                let sector = geometry::first_sector_of_cluster(new_cluster);
                device.write_sector(sector, &[0u8; SECTOR_SIZE])?;
                let pos = SlotPos { sector, offset: 0 };
                Self::write_slot(device, pos, &entry.serialize())?;
                Ok(pos)
            }
        }
    }

    /// Remove the live entry named `name`. Frees its cluster chain (if
    /// any); fails `DirNotEmpty` when removing a non-empty sub-directory.
    pub fn remove(&self, device: &mut dyn SectorDevice, name: &ShortName) -> Result<()> {
        let (pos, entry) = self
            .lookup(device, name)?
            .ok_or_else(|| Fat12Error::NotFound(name.display()))?;

        if entry.is_directory() && entry.start_cluster as u32 >= geometry::FIRST_DATA_CLUSTER {
            let sub = Directory::sub(entry.start_cluster as u32);
            if !sub.iter_visible(device)?.is_empty() {
                return Err(Fat12Error::DirNotEmpty);
            }
        }

        let mut bytes = entry.serialize();
        DirEntry::mark_deleted(&mut bytes);
        Self::write_slot(device, pos, &bytes)?;

        if entry.start_cluster as u32 >= geometry::FIRST_DATA_CLUSTER {
            FatTable::free_chain(device, entry.start_cluster as u32)?;
        }
        Ok(())
    }

    /// Rewrite the name of an existing live entry in place. Does not move
    /// the slot.
    pub fn rename(&self, device: &mut dyn SectorDevice, old: &ShortName, new: ShortName) -> Result<()> {
        if self.lookup(device, &new)?.is_some() {
            return Err(Fat12Error::Exists(new.display()));
        }
        let (pos, mut entry) = self
            .lookup(device, old)?
            .ok_or_else(|| Fat12Error::NotFound(old.display()))?;
        entry.name = new;
        Self::write_slot(device, pos, &entry.serialize())
    }

    /// Overwrite an entry's mutable fields (size/start_cluster/timestamps)
    /// in place, used by [`crate::file::FileHandle`] on flush.
    pub fn update(&self, device: &mut dyn SectorDevice, pos: SlotPos, entry: DirEntry) -> Result<()> {
        Self::write_slot(device, pos, &entry.serialize())
    }

    /// Initialise a freshly allocated cluster as a new sub-directory: zero
    /// it, then write the `.` and `..` entries.
    pub fn init_sub_directory(
        device: &mut dyn SectorDevice,
        own_cluster: u32,
        parent_cluster: u32,
        mtime: u16,
        mdate: u16,
    ) -> Result<()> {
        let sector = geometry::first_sector_of_cluster(own_cluster);
        device.write_sector(sector, &[0u8; SECTOR_SIZE])?;

        let dot = DirEntry {
            name: ShortName::normalize(".").unwrap_or(ShortName {
                base: *b".       ",
                ext: *b"   ",
            }),
            attrs: Attributes::DIRECTORY,
            mtime,
            mdate,
            start_cluster: own_cluster as u16,
            size: 0,
        };
        let dotdot = DirEntry {
            name: ShortName {
                base: *b"..      ",
                ext: *b"   ",
            },
            attrs: Attributes::DIRECTORY,
            mtime,
            mdate,
            start_cluster: parent_cluster as u16,
            size: 0,
        };

        let mut buf = device.read_sector(sector)?;
        buf[0..ENTRY_SIZE].copy_from_slice(&dot.serialize());
        buf[ENTRY_SIZE..2 * ENTRY_SIZE].copy_from_slice(&dotdot.serialize());
        device.write_sector(sector, &buf)
    }
}
