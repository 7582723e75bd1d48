//! Formatter: lays down a fresh FAT12 volume on a blank image.
//!
//! Builds the boot sector via `geometry::BiosParameterBlock` and the two
//! FAT copies via `fat::FatTable`'s reserved-entry convention (cluster 0
//! holds the media descriptor in its low byte, cluster 1 is EOC).

use crate::entry::{Attributes, DirEntry, ShortName};
use crate::error::Result;
use crate::fat::{EOC, FatTable};
use crate::geometry::{self, BiosParameterBlock, MEDIA_DESCRIPTOR, ROOT_DIR_SECTOR, ROOT_DIR_SECTORS};
use crate::sector::{SectorDevice, Image, SECTOR_SIZE};

/// Format a blank [`Image`] into an empty, valid FAT12 volume: boot sector,
/// both FATs' reserved entries, and a zeroed root directory. An optional
/// volume label is written as the root's first entry.
pub fn format(
    volume_serial: u32,
    volume_label: Option<&str>,
) -> Result<Image> {
    let mut image = Image::new_blank();

    let label_bytes = match volume_label {
        Some(label) => pad_label(label)?,
        None => [0x20u8; 11],
    };
    let bpb = BiosParameterBlock::new(volume_serial, label_bytes);
    image.write_sector(0, &bpb.to_sector())?;

    for sector in geometry::FAT1_SECTOR..geometry::FAT1_SECTOR + geometry::SECTORS_PER_FAT as usize {
        image.write_sector(sector, &[0u8; SECTOR_SIZE])?;
    }
    for sector in geometry::FAT2_SECTOR..geometry::FAT2_SECTOR + geometry::SECTORS_PER_FAT as usize {
        image.write_sector(sector, &[0u8; SECTOR_SIZE])?;
    }
    FatTable::set(&mut image, 0, 0xF00 | MEDIA_DESCRIPTOR as u16)?;
    FatTable::set(&mut image, 1, EOC)?;

    for sector in ROOT_DIR_SECTOR..ROOT_DIR_SECTOR + ROOT_DIR_SECTORS as usize {
        image.write_sector(sector, &[0u8; SECTOR_SIZE])?;
    }

    if let Some(label) = volume_label {
        let name = label_entry_name(label)?;
        let entry = DirEntry::new(name, Attributes::VOLUME_ID, 0, 0);
        let mut buf = image.read_sector(ROOT_DIR_SECTOR)?;
        buf[0..crate::entry::ENTRY_SIZE].copy_from_slice(&entry.serialize());
        image.write_sector(ROOT_DIR_SECTOR, &buf)?;
    }

    Ok(image)
}

fn pad_label(label: &str) -> Result<[u8; 11]> {
    let upper = label.to_ascii_uppercase();
    let mut out = [0x20u8; 11];
    let bytes = upper.as_bytes();
    let len = bytes.len().min(11);
    out[..len].copy_from_slice(&bytes[..len]);
    Ok(out)
}

/// Volume-label entries use all 11 name bytes as one field, unlike 8.3
/// file names, so this bypasses [`ShortName::normalize`]'s dot-splitting.
fn label_entry_name(label: &str) -> Result<ShortName> {
    let padded = pad_label(label)?;
    let mut base = [0x20u8; 8];
    base.copy_from_slice(&padded[..8]);
    let mut ext = [0x20u8; 3];
    ext.copy_from_slice(&padded[8..11]);
    Ok(ShortName { base, ext })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dir::Directory;

    #[test]
    fn formatted_image_has_valid_boot_sector() {
        let image = format(0x1234_5678, None).unwrap();
        let sector = image.read_sector(0).unwrap();
        BiosParameterBlock::parse(&sector).unwrap();
    }

    #[test]
    fn formatted_image_has_reserved_fat_entries() {
        let image = format(1, None).unwrap();
        assert_eq!(FatTable::get(&image, 1).unwrap(), EOC);
    }

    #[test]
    fn formatted_image_root_is_empty_without_label() {
        let image = format(1, None).unwrap();
        let root = Directory::root();
        assert!(root.iter(&image).unwrap().is_empty());
    }

    #[test]
    fn formatted_image_with_label_has_one_entry() {
        let image = format(1, Some("MYDISK")).unwrap();
        let root = Directory::root();
        let entries = root.iter(&image).unwrap();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].1.is_volume_label());
    }

    #[test]
    fn fats_mirror_each_other_after_format() {
        let image = format(1, None).unwrap();
        let fat1 = image.read_sector(geometry::FAT1_SECTOR).unwrap();
        let fat2 = image.read_sector(geometry::FAT2_SECTOR).unwrap();
        assert_eq!(fat1, fat2);
    }
}
