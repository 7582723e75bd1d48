//! 32-byte FAT12 directory entries: 8.3 names, attributes, timestamps.
//!
//! This crate has no long-name extension, so long-name slots are
//! recognized only well enough to be skipped on read; the checksum and
//! UTF-16 machinery a long-name implementation would need is left out
//! entirely. Attributes live in a `bitflags!` struct rather than a raw
//! masked `u8`.

use bitflags::bitflags;

use crate::error::{Fat12Error, Result};

pub const ENTRY_SIZE: usize = 32;

const ILLEGAL_NAME_CHARS: &[u8] = b"\"*+,/:;<=>?[\\]|";

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Attributes: u8 {
        const READ_ONLY  = 0x01;
        const HIDDEN     = 0x02;
        const SYSTEM     = 0x04;
        const VOLUME_ID  = 0x08;
        const DIRECTORY  = 0x10;
        const ARCHIVE    = 0x20;
        /// Long-file-name slot marker: `0x0F` together. Entries
        /// bearing exactly this value are skipped on read and never created.
        const LFN = Self::READ_ONLY.bits() | Self::HIDDEN.bits() | Self::SYSTEM.bits() | Self::VOLUME_ID.bits();
    }
}

impl Attributes {
    pub fn is_lfn(self) -> bool {
        self.bits() == Self::LFN.bits()
    }
}

/// An 8.3 name, already split, uppercased, and space-padded to 8+3 bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShortName {
    pub base: [u8; 8],
    pub ext: [u8; 3],
}

impl ShortName {
    /// Normalise a user-supplied name into its on-disk 8.3 form (spec
    /// §4.4): trim, split at the last `.`, uppercase both halves, pad with
    /// spaces, and reject illegal bytes/empty base/non-ASCII.
    pub fn normalize(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        if !trimmed.is_ascii() {
            return Err(Fat12Error::BadName(format!("{input:?}: non-ASCII bytes")));
        }
        let (base_str, ext_str) = match trimmed.rfind('.') {
            Some(i) => (&trimmed[..i], &trimmed[i + 1..]),
            None => (trimmed, ""),
        };
        if base_str.is_empty() {
            return Err(Fat12Error::BadName(format!("{input:?}: empty base name")));
        }
        if base_str.len() > 8 || ext_str.len() > 3 {
            return Err(Fat12Error::BadName(format!(
                "{input:?}: base/extension too long for 8.3"
            )));
        }
        let upper_base = base_str.to_ascii_uppercase();
        let upper_ext = ext_str.to_ascii_uppercase();
        for b in upper_base.bytes().chain(upper_ext.bytes()) {
            if b < 0x20 || ILLEGAL_NAME_CHARS.contains(&b) {
                return Err(Fat12Error::BadName(format!(
                    "{input:?}: illegal character {b:#04x}"
                )));
            }
        }

        let mut base = [b' '; 8];
        base[..upper_base.len()].copy_from_slice(upper_base.as_bytes());
        let mut ext = [b' '; 3];
        ext[..upper_ext.len()].copy_from_slice(upper_ext.as_bytes());
        Ok(Self { base, ext })
    }

    /// Reassemble the human-readable `NAME.EXT` form (empty extension
    /// omits the dot).
    pub fn display(&self) -> String {
        let base = std::str::from_utf8(&self.base).unwrap_or("").trim_end();
        let ext = std::str::from_utf8(&self.ext).unwrap_or("").trim_end();
        if ext.is_empty() {
            base.to_string()
        } else {
            format!("{base}.{ext}")
        }
    }
}

/// A single parsed 32-byte slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    /// `name[0] == 0x00`: free, and every slot after it in the directory is
    /// also free.
    NeverUsed,
    /// `name[0] == 0xE5`: free, but later slots may still be live.
    Deleted,
    /// `attr == 0x0F`: an LFN helper slot, skipped on read.
    LfnSkip,
    /// A live 8.3 entry.
    Live(DirEntry),
}

/// A live directory entry's fields, independent of on-disk byte layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirEntry {
    pub name: ShortName,
    pub attrs: Attributes,
    pub mtime: u16,
    pub mdate: u16,
    pub start_cluster: u16,
    pub size: u32,
}

impl DirEntry {
    pub fn new(name: ShortName, attrs: Attributes, mtime: u16, mdate: u16) -> Self {
        Self {
            name,
            attrs,
            mtime,
            mdate,
            start_cluster: 0,
            size: 0,
        }
    }

    pub fn is_directory(&self) -> bool {
        self.attrs.contains(Attributes::DIRECTORY)
    }

    pub fn is_volume_label(&self) -> bool {
        self.attrs.contains(Attributes::VOLUME_ID) && !self.is_directory()
    }

    /// Parse one 32-byte slot.
    pub fn parse(bytes: &[u8; ENTRY_SIZE]) -> Slot {
        match bytes[0] {
            0x00 => return Slot::NeverUsed,
            0xE5 => return Slot::Deleted,
            _ => {}
        }
        let attr = bytes[11];
        if attr == Attributes::LFN.bits() {
            return Slot::LfnSkip;
        }

        let mut base = [0u8; 8];
        base.copy_from_slice(&bytes[0..8]);
        // 0x05 at byte 0 means a literal 0xE5 character.
        if base[0] == 0x05 {
            base[0] = 0xE5;
        }
        let mut ext = [0u8; 3];
        ext.copy_from_slice(&bytes[8..11]);

        let mtime = u16::from_le_bytes([bytes[22], bytes[23]]);
        let mdate = u16::from_le_bytes([bytes[24], bytes[25]]);
        let start_cluster = u16::from_le_bytes([bytes[26], bytes[27]]);
        let size = u32::from_le_bytes([bytes[28], bytes[29], bytes[30], bytes[31]]);

        Slot::Live(DirEntry {
            name: ShortName { base, ext },
            attrs: Attributes::from_bits_truncate(attr),
            mtime,
            mdate,
            start_cluster,
            size,
        })
    }

    /// Serialize back to 32 bytes. Parsing an entry and reserializing it
    /// always reproduces the original bytes.
    pub fn serialize(&self) -> [u8; ENTRY_SIZE] {
        let mut bytes = [0u8; ENTRY_SIZE];
        let mut base = self.name.base;
        // the on-disk encoding of a literal 0xE5 is 0x05.
        if base[0] == 0xE5 {
            base[0] = 0x05;
        }
        bytes[0..8].copy_from_slice(&base);
        bytes[8..11].copy_from_slice(&self.name.ext);
        bytes[11] = self.attrs.bits();
        bytes[22..24].copy_from_slice(&self.mtime.to_le_bytes());
        bytes[24..26].copy_from_slice(&self.mdate.to_le_bytes());
        bytes[26..28].copy_from_slice(&self.start_cluster.to_le_bytes());
        bytes[28..32].copy_from_slice(&self.size.to_le_bytes());
        bytes
    }

    /// A deleted-slot marker preserving whatever bytes aren't part of the
    /// name/attr/size fields, for use by [`crate::dir::Directory::remove`].
    pub fn mark_deleted(bytes: &mut [u8; ENTRY_SIZE]) {
        bytes[0] = 0xE5;
    }
}
