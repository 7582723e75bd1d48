//! BIOS Parameter Block (BPB) and boot sector for the 1.44 MB FAT12 geometry.
//!
//! This crate supports exactly one geometry, so `BiosParameterBlock::parse`
//! exists mainly to validate that an incoming image really is that shape
//! rather than to support variation across FAT12/FAT16/FAT32.

use crate::error::{Fat12Error, Result};
use crate::sector::SECTOR_SIZE;

pub const BYTES_PER_SECTOR: u16 = 512;
pub const SECTORS_PER_CLUSTER: u8 = 1;
pub const RESERVED_SECTORS: u16 = 1;
pub const NUM_FATS: u8 = 2;
pub const ROOT_ENTRY_COUNT: u16 = 224;
pub const TOTAL_SECTORS: u16 = 2_880;
pub const MEDIA_DESCRIPTOR: u8 = 0xF0;
pub const SECTORS_PER_FAT: u16 = 9;
pub const SECTORS_PER_TRACK: u16 = 18;
pub const HEADS: u16 = 2;

/// Sectors occupied by one root-directory region (32 bytes/entry).
pub const ROOT_DIR_SECTORS: u16 =
    ((ROOT_ENTRY_COUNT as u32 * 32 + BYTES_PER_SECTOR as u32 - 1) / BYTES_PER_SECTOR as u32) as u16;

/// First sector of FAT #1.
pub const FAT1_SECTOR: usize = RESERVED_SECTORS as usize;
/// First sector of FAT #2.
pub const FAT2_SECTOR: usize = FAT1_SECTOR + SECTORS_PER_FAT as usize;
/// First sector of the root directory.
pub const ROOT_DIR_SECTOR: usize = FAT2_SECTOR + SECTORS_PER_FAT as usize;
/// First sector of the data region (cluster 2).
pub const DATA_START_SECTOR: usize = ROOT_DIR_SECTOR + ROOT_DIR_SECTORS as usize;
/// Lowest valid data cluster number.
pub const FIRST_DATA_CLUSTER: u32 = 2;
/// Number of addressable data clusters; bounds chain-walk length to 2,847.
pub const DATA_CLUSTER_COUNT: u32 = TOTAL_SECTORS as u32 - DATA_START_SECTOR as u32;
/// Highest valid data cluster number (inclusive).
pub const MAX_CLUSTER: u32 = FIRST_DATA_CLUSTER + DATA_CLUSTER_COUNT - 1;

pub const OEM_NAME: &[u8; 8] = b"FAT12RS ";
pub const FS_TYPE: &[u8; 8] = b"FAT12   ";
pub const BOOT_SIGNATURE: u16 = 0xAA55;

/// Map a data cluster number to its first sector on the image.
pub fn first_sector_of_cluster(cluster: u32) -> usize {
    debug_assert!(cluster >= FIRST_DATA_CLUSTER);
    DATA_START_SECTOR + (cluster as usize - FIRST_DATA_CLUSTER as usize) * SECTORS_PER_CLUSTER as usize
}

/// The parsed BIOS Parameter Block. Since this crate supports exactly one
/// geometry, `parse` exists mainly to validate an on-disk image really is
/// that geometry.
#[derive(Debug, Clone, Copy)]
pub struct BiosParameterBlock {
    pub volume_serial: u32,
    pub volume_label: [u8; 11],
}

impl BiosParameterBlock {
    pub fn new(volume_serial: u32, volume_label: [u8; 11]) -> Self {
        Self {
            volume_serial,
            volume_label,
        }
    }

    /// Parse and validate a boot sector against the fixed geometry fields
    /// below, failing `UnsupportedGeometry` on any mismatch.
    pub fn parse(sector: &[u8; SECTOR_SIZE]) -> Result<Self> {
        let byts_per_sec = u16::from_le_bytes([sector[11], sector[12]]);
        let sec_per_clus = sector[13];
        let rsvd_sec_cnt = u16::from_le_bytes([sector[14], sector[15]]);
        let num_fats = sector[16];
        let root_ent_cnt = u16::from_le_bytes([sector[17], sector[18]]);
        let tot_sec16 = u16::from_le_bytes([sector[19], sector[20]]);
        let media = sector[21];
        let fat_sz16 = u16::from_le_bytes([sector[22], sector[23]]);
        let signature = u16::from_le_bytes([sector[510], sector[511]]);

        if byts_per_sec != BYTES_PER_SECTOR
            || sec_per_clus != SECTORS_PER_CLUSTER
            || rsvd_sec_cnt != RESERVED_SECTORS
            || num_fats != NUM_FATS
            || root_ent_cnt != ROOT_ENTRY_COUNT
            || tot_sec16 != TOTAL_SECTORS
            || media != MEDIA_DESCRIPTOR
            || fat_sz16 != SECTORS_PER_FAT
            || signature != BOOT_SIGNATURE
        {
            return Err(Fat12Error::UnsupportedGeometry(
                "boot sector does not describe a 1.44 MB FAT12 geometry".into(),
            ));
        }

        let volume_serial = u32::from_le_bytes([sector[39], sector[40], sector[41], sector[42]]);
        let mut volume_label = [0x20u8; 11];
        volume_label.copy_from_slice(&sector[43..54]);

        Ok(Self {
            volume_serial,
            volume_label,
        })
    }

    /// Serialize a fresh boot sector for this geometry.
    pub fn to_sector(&self) -> [u8; SECTOR_SIZE] {
        let mut s = [0u8; SECTOR_SIZE];
        s[0..3].copy_from_slice(&[0xEB, 0x3C, 0x90]);
        s[3..11].copy_from_slice(OEM_NAME);
        s[11..13].copy_from_slice(&BYTES_PER_SECTOR.to_le_bytes());
        s[13] = SECTORS_PER_CLUSTER;
        s[14..16].copy_from_slice(&RESERVED_SECTORS.to_le_bytes());
        s[16] = NUM_FATS;
        s[17..19].copy_from_slice(&ROOT_ENTRY_COUNT.to_le_bytes());
        s[19..21].copy_from_slice(&TOTAL_SECTORS.to_le_bytes());
        s[21] = MEDIA_DESCRIPTOR;
        s[22..24].copy_from_slice(&SECTORS_PER_FAT.to_le_bytes());
        s[24..26].copy_from_slice(&SECTORS_PER_TRACK.to_le_bytes());
        s[26..28].copy_from_slice(&HEADS.to_le_bytes());
        // hidden sectors (4 bytes), large total sectors (4 bytes) stay zero
        s[36] = 0x00; // drive number
        s[37] = 0x00; // reserved
        s[38] = 0x29; // extended boot signature
        s[39..43].copy_from_slice(&self.volume_serial.to_le_bytes());
        s[43..54].copy_from_slice(&self.volume_label);
        s[54..62].copy_from_slice(FS_TYPE);
        s[510..512].copy_from_slice(&BOOT_SIGNATURE.to_le_bytes());
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_offsets_match_spec() {
        assert_eq!(FAT1_SECTOR, 1);
        assert_eq!(FAT2_SECTOR, 10);
        assert_eq!(ROOT_DIR_SECTOR, 19);
        assert_eq!(ROOT_DIR_SECTORS, 14);
        assert_eq!(DATA_START_SECTOR, 33);
    }

    #[test]
    fn roundtrips_through_bytes() {
        let bpb = BiosParameterBlock::new(0xDEAD_BEEF, *b"MYDISK     ");
        let sector = bpb.to_sector();
        let parsed = BiosParameterBlock::parse(&sector).unwrap();
        assert_eq!(parsed.volume_serial, 0xDEAD_BEEF);
        assert_eq!(&parsed.volume_label, b"MYDISK     ");
    }

    #[test]
    fn rejects_wrong_geometry() {
        let mut sector = BiosParameterBlock::new(1, [0x20; 11]).to_sector();
        sector[13] = 2; // sectors per cluster != 1
        assert!(matches!(
            BiosParameterBlock::parse(&sector),
            Err(Fat12Error::UnsupportedGeometry(_))
        ));
    }

    #[test]
    fn signature_present_at_offset_510() {
        let bpb = BiosParameterBlock::new(1, [0x20; 11]);
        let sector = bpb.to_sector();
        assert_eq!(&sector[510..512], &[0x55, 0xAA]);
    }
}
