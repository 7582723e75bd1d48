//! FAT Table: the bit-packed 12-bit allocation table.
//!
//! The "1.5 bytes per entry" nibble packing is easy to get backwards, so
//! it lives only in `get_at`/`set_at` below; no call site outside this
//! module touches a raw nibble.

use log::trace;

use crate::error::{Fat12Error, Result};
use crate::geometry::{self, FAT1_SECTOR, FAT2_SECTOR, MAX_CLUSTER, TOTAL_SECTORS};
use crate::sector::{SectorDevice, SECTOR_SIZE};

pub const FREE: u16 = 0x000;
pub const RESERVED: u16 = 0x001;
pub const BAD_CLUSTER: u16 = 0xFF7;
pub const EOC_MIN: u16 = 0xFF8;
pub const EOC: u16 = 0xFFF;

fn is_eoc(value: u16) -> bool {
    value >= EOC_MIN
}

fn is_reserved(value: u16) -> bool {
    value == FREE || value == RESERVED || (0xFF0..=0xFF6).contains(&value)
}

/// Byte offset of the 3-byte pair holding the entries for `cluster` and its
/// sibling: entries are packed in pairs `(2k, 2k+1)` sharing 3 bytes.
fn entry_byte_offset(cluster: u32) -> usize {
    (cluster as usize * 3) / 2
}

fn read_byte(device: &dyn SectorDevice, fat_sector: usize, byte_offset: usize) -> Result<u8> {
    let sector = fat_sector + byte_offset / SECTOR_SIZE;
    let offset = byte_offset % SECTOR_SIZE;
    Ok(device.read_sector(sector)?[offset])
}

fn write_byte(
    device: &mut dyn SectorDevice,
    fat_sector: usize,
    byte_offset: usize,
    value: u8,
) -> Result<()> {
    let sector = fat_sector + byte_offset / SECTOR_SIZE;
    let offset = byte_offset % SECTOR_SIZE;
    let mut buf = device.read_sector(sector)?;
    buf[offset] = value;
    device.write_sector(sector, &buf)
}

fn get_at(device: &dyn SectorDevice, fat_sector: usize, cluster: u32) -> Result<u16> {
    let off = entry_byte_offset(cluster);
    let b0 = read_byte(device, fat_sector, off)? as u16;
    let b1 = read_byte(device, fat_sector, off + 1)? as u16;
    Ok(if cluster % 2 == 0 {
        b0 | ((b1 & 0x0F) << 8)
    } else {
        (b0 >> 4) | (b1 << 4)
    })
}

fn set_at(
    device: &mut dyn SectorDevice,
    fat_sector: usize,
    cluster: u32,
    value: u16,
) -> Result<()> {
    let off = entry_byte_offset(cluster);
    let b0 = read_byte(device, fat_sector, off)?;
    let b1 = read_byte(device, fat_sector, off + 1)?;
    let (new_b0, new_b1) = if cluster % 2 == 0 {
        (
            (value & 0xFF) as u8,
            (b1 & 0xF0) | (((value >> 8) & 0x0F) as u8),
        )
    } else {
        ((b0 & 0x0F) | (((value & 0x0F) << 4) as u8), (value >> 4) as u8)
    };
    write_byte(device, fat_sector, off, new_b0)?;
    write_byte(device, fat_sector, off + 1, new_b1)
}

/// The allocation table. Owns no storage itself, every call reads/writes
/// through the image's two FAT copies, keeping them byte-identical.
/// Mirroring is synchronous; there is no deferred "dirty" write.
pub struct FatTable;

impl FatTable {
    /// Read the 12-bit entry for `n`. Reads are served from FAT1. `n` may
    /// range over every table slot (`0..2880`), not just the data clusters
    /// a chain walk can reach; slots above `MAX_CLUSTER` just never appear
    /// in a valid chain.
    pub fn get(device: &dyn SectorDevice, n: u32) -> Result<u16> {
        if n >= TOTAL_SECTORS as u32 {
            return Err(Fat12Error::BadCluster(n));
        }
        get_at(device, FAT1_SECTOR, n)
    }

    /// Write `value` into cluster `n`'s entry in both FAT1 and FAT2.
    pub fn set(device: &mut dyn SectorDevice, n: u32, value: u16) -> Result<()> {
        if n >= TOTAL_SECTORS as u32 {
            return Err(Fat12Error::BadCluster(n));
        }
        set_at(device, FAT1_SECTOR, n, value)?;
        set_at(device, FAT2_SECTOR, n, value)?;
        trace!("fat[{n}] = {value:#05x}");
        Ok(())
    }

    /// Scan from cluster 2 upward for the first free entry, mark it EOC,
    /// and return its index. First-fit by ascending cluster number, kept
    /// deterministic for tests.
    pub fn alloc_one(device: &mut dyn SectorDevice) -> Result<u32> {
        for c in geometry::FIRST_DATA_CLUSTER..=MAX_CLUSTER {
            if get_at(device, FAT1_SECTOR, c)? == FREE {
                Self::set(device, c, EOC)?;
                return Ok(c);
            }
        }
        Err(Fat12Error::NoSpace)
    }

    /// Allocate `k` clusters and link them into a single chain, rolling
    /// back any partial allocation on failure.
    pub fn alloc_chain(device: &mut dyn SectorDevice, k: usize) -> Result<Vec<u32>> {
        let mut allocated = Vec::with_capacity(k);
        for i in 0..k {
            match Self::alloc_one(device) {
                Ok(cluster) => {
                    if i > 0 {
                        let prev = allocated[i - 1];
                        Self::set(device, prev, cluster as u16)?;
                    }
                    allocated.push(cluster);
                }
                Err(e) => {
                    for c in &allocated {
                        let _ = Self::set(device, *c, FREE);
                    }
                    return Err(e);
                }
            }
        }
        Ok(allocated)
    }

    /// Walk the chain starting at `start`, validating as it goes: free or
    /// reserved entries and cycles both fail `BadChain`.
    pub fn walk(device: &dyn SectorDevice, start: u32) -> Result<Vec<u32>> {
        let mut clusters = Vec::new();
        let mut seen = std::collections::HashSet::new();
        let mut current = start;
        loop {
            if !seen.insert(current) {
                return Err(Fat12Error::BadChain(format!(
                    "cycle detected at cluster {current}"
                )));
            }
            clusters.push(current);
            if clusters.len() > geometry::DATA_CLUSTER_COUNT as usize {
                return Err(Fat12Error::BadChain("chain longer than volume".into()));
            }
            let value = get_at(device, FAT1_SECTOR, current)?;
            if is_eoc(value) {
                break;
            }
            if is_reserved(value) || value == BAD_CLUSTER {
                return Err(Fat12Error::BadChain(format!(
                    "cluster {current} points to reserved/free entry {value:#05x}"
                )));
            }
            current = value as u32;
        }
        Ok(clusters)
    }

    /// Free every cluster in the chain starting at `start`.
    pub fn free_chain(device: &mut dyn SectorDevice, start: u32) -> Result<()> {
        let clusters = Self::walk(device, start)?;
        for c in clusters {
            Self::set(device, c, FREE)?;
        }
        Ok(())
    }

    /// Keep the first `keep_k` clusters of the chain, freeing the rest and
    /// terminating the new tail. `keep_k == 0` frees the whole chain; the
    /// caller is then responsible for clearing the directory entry's start
    /// cluster.
    pub fn truncate(device: &mut dyn SectorDevice, start: u32, keep_k: usize) -> Result<()> {
        let clusters = Self::walk(device, start)?;
        if keep_k >= clusters.len() {
            return Ok(());
        }
        if keep_k == 0 {
            for c in &clusters {
                Self::set(device, *c, FREE)?;
            }
            return Ok(());
        }
        for c in &clusters[keep_k..] {
            Self::set(device, *c, FREE)?;
        }
        Self::set(device, clusters[keep_k - 1], EOC)
    }

    /// Append `add_k` new clusters to the end of the chain starting at
    /// `start`, returning the newly allocated cluster numbers.
    pub fn extend(device: &mut dyn SectorDevice, start: u32, add_k: usize) -> Result<Vec<u32>> {
        if add_k == 0 {
            return Ok(Vec::new());
        }
        let clusters = Self::walk(device, start)?;
        let tail = *clusters.last().unwrap();
        let new_clusters = Self::alloc_chain(device, add_k)?;
        Self::set(device, tail, new_clusters[0] as u16)?;
        Ok(new_clusters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sector::Image;

    fn blank_fat() -> Image {
        let mut img = Image::new_blank();
        // reserved entries: cluster 0 = media descriptor, cluster 1 = EOC
        FatTable::set(&mut img, 0, 0xF00 | 0x0F0).unwrap();
        FatTable::set(&mut img, 1, EOC).unwrap();
        img
    }

    #[test]
    fn pack_unpack_roundtrip_even_odd_pair() {
        let mut img = blank_fat();
        FatTable::set(&mut img, 2, 0x123).unwrap();
        FatTable::set(&mut img, 3, 0x456).unwrap();
        assert_eq!(FatTable::get(&img, 2).unwrap(), 0x123);
        assert_eq!(FatTable::get(&img, 3).unwrap(), 0x456);
    }

    #[test]
    fn set_mirrors_to_both_fats() {
        let mut img = blank_fat();
        FatTable::set(&mut img, 10, 0x042).unwrap();
        let fat1 = img.read_sector(FAT1_SECTOR).unwrap();
        let fat2 = img.read_sector(FAT2_SECTOR).unwrap();
        assert_eq!(fat1, fat2);
    }

    #[test]
    fn alloc_one_finds_first_free_cluster() {
        let mut img = blank_fat();
        let c = FatTable::alloc_one(&mut img).unwrap();
        assert_eq!(c, 2);
        let c2 = FatTable::alloc_one(&mut img).unwrap();
        assert_eq!(c2, 3);
    }

    #[test]
    fn alloc_chain_links_clusters_in_order() {
        let mut img = blank_fat();
        let chain = FatTable::alloc_chain(&mut img, 3).unwrap();
        assert_eq!(chain, vec![2, 3, 4]);
        assert_eq!(FatTable::get(&img, 2).unwrap(), 3);
        assert_eq!(FatTable::get(&img, 3).unwrap(), 4);
        assert_eq!(FatTable::get(&img, 4).unwrap(), EOC);
    }

    #[test]
    fn walk_detects_cycle() {
        let mut img = blank_fat();
        FatTable::set(&mut img, 2, 3).unwrap();
        FatTable::set(&mut img, 3, 2).unwrap();
        assert!(matches!(
            FatTable::walk(&img, 2),
            Err(Fat12Error::BadChain(_))
        ));
    }

    #[test]
    fn walk_rejects_free_successor() {
        let mut img = blank_fat();
        FatTable::set(&mut img, 2, 0).unwrap();
        assert!(matches!(
            FatTable::walk(&img, 2),
            Err(Fat12Error::BadChain(_))
        ));
    }

    #[test]
    fn free_chain_resets_entries_to_free() {
        let mut img = blank_fat();
        let chain = FatTable::alloc_chain(&mut img, 2).unwrap();
        FatTable::free_chain(&mut img, chain[0]).unwrap();
        assert_eq!(FatTable::get(&img, chain[0]).unwrap(), FREE);
        assert_eq!(FatTable::get(&img, chain[1]).unwrap(), FREE);
    }

    #[test]
    fn truncate_frees_tail_and_sets_new_eoc() {
        let mut img = blank_fat();
        let chain = FatTable::alloc_chain(&mut img, 4).unwrap();
        FatTable::truncate(&mut img, chain[0], 2).unwrap();
        assert_eq!(FatTable::get(&img, chain[1]).unwrap(), EOC);
        assert_eq!(FatTable::get(&img, chain[2]).unwrap(), FREE);
        assert_eq!(FatTable::get(&img, chain[3]).unwrap(), FREE);
    }

    #[test]
    fn extend_appends_new_clusters() {
        let mut img = blank_fat();
        let chain = FatTable::alloc_chain(&mut img, 1).unwrap();
        let added = FatTable::extend(&mut img, chain[0], 2).unwrap();
        assert_eq!(added.len(), 2);
        let full = FatTable::walk(&img, chain[0]).unwrap();
        assert_eq!(full.len(), 3);
    }

    #[test]
    fn alloc_chain_rolls_back_on_exhaustion() {
        let mut img = blank_fat();
        let total = geometry::DATA_CLUSTER_COUNT as usize;
        let _ = FatTable::alloc_chain(&mut img, total - 2).unwrap();
        assert!(FatTable::alloc_chain(&mut img, 5).is_err());
        let mut free = 0;
        for c in geometry::FIRST_DATA_CLUSTER..=MAX_CLUSTER {
            if FatTable::get(&img, c).unwrap() == FREE {
                free += 1;
            }
        }
        assert_eq!(free, 2);
    }
}
