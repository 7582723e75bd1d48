//! FileSystem: the crate's top-level API, composing sector/geometry/fat/
//! entry/dir/path/file/format into one surface.
//!
//! Single-threaded and synchronous by design: every operation borrows the
//! image directly (`&self` for reads, `&mut self` for mutations) instead
//! of going through shared, lock-guarded interior state.

use log::info;

use crate::clock::{Clock, SystemClock};
use crate::dir::{Directory, DirLocation};
use crate::entry::{Attributes, DirEntry, ShortName};
use crate::error::{Fat12Error, Result};
use crate::fat::FatTable;
use crate::file::FileHandle;
use crate::format;
use crate::geometry::BiosParameterBlock;
use crate::path;
use crate::sector::{Image, SectorDevice};

/// One directory entry as surfaced to callers of [`FileSystem::list`].
#[derive(Debug, Clone)]
pub struct DirListing {
    pub name: String,
    pub is_directory: bool,
    pub size: u32,
    pub attrs: Attributes,
    pub mtime: u16,
    pub mdate: u16,
}

/// A mounted FAT12 volume plus the clock used to stamp new/modified
/// entries. Owns its [`Image`] outright; there is no shared/background
/// access to guard against.
pub struct FileSystem {
    image: Image,
    clock: Box<dyn Clock>,
}

impl FileSystem {
    /// Format a brand-new blank volume and mount it.
    pub fn format(volume_serial: u32, volume_label: Option<&str>) -> Result<Self> {
        info!("formatting new FAT12 volume, serial={volume_serial:#010x}");
        let image = format::format(volume_serial, volume_label)?;
        Ok(Self {
            image,
            clock: Box::new(SystemClock),
        })
    }

    /// Mount an existing image, validating its boot sector.
    pub fn mount(image: Image) -> Result<Self> {
        let sector = image.read_sector(0)?;
        BiosParameterBlock::parse(&sector)?;
        Ok(Self {
            image,
            clock: Box::new(SystemClock),
        })
    }

    /// Load an image file from disk and mount it.
    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self> {
        Self::mount(Image::open(path)?)
    }

    /// Save the current image buffer to disk as a single snapshot.
    pub fn save(&self, path: impl AsRef<std::path::Path>) -> Result<()> {
        self.image.save(path)
    }

    /// Swap in a deterministic clock, for tests.
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    fn read_boot_sector(&self) -> Result<BiosParameterBlock> {
        BiosParameterBlock::parse(&self.image.read_sector(0)?)
    }

    /// The volume label from the boot sector.
    pub fn label(&self) -> Result<String> {
        let bpb = self.read_boot_sector()?;
        Ok(String::from_utf8_lossy(&bpb.volume_label).trim_end().to_string())
    }

    /// Rewrite the boot sector's volume label in place. Does not touch the
    /// root directory's separate volume-label *entry*, if one was written
    /// at format time; the two are independent fields.
    pub fn set_label(&mut self, label: &str) -> Result<()> {
        let bpb = self.read_boot_sector()?;
        let upper = label.to_ascii_uppercase();
        let mut bytes = [0x20u8; 11];
        let len = upper.as_bytes().len().min(11);
        bytes[..len].copy_from_slice(&upper.as_bytes()[..len]);
        let new_bpb = BiosParameterBlock::new(bpb.volume_serial, bytes);
        self.image.write_sector(0, &new_bpb.to_sector())
    }

    /// List the entries of the directory at `path`, including `.`/`..` for
    /// sub-directories.
    pub fn list(&self, path: &str) -> Result<Vec<DirListing>> {
        let dir = path::resolve_directory(&self.image, path)?;
        dir.iter(&self.image).map(|entries| {
            entries
                .into_iter()
                .map(|(_, e)| DirListing {
                    name: e.name.display(),
                    is_directory: e.is_directory(),
                    size: e.size,
                    attrs: e.attrs,
                    mtime: e.mtime,
                    mdate: e.mdate,
                })
                .collect()
        })
    }

    /// Read a file's full contents.
    pub fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let resolved = path::resolve(&self.image, path)?;
        let (pos, entry) = resolved
            .existing
            .ok_or_else(|| Fat12Error::NotFound(resolved.name.display()))?;
        let handle = FileHandle::new(resolved.parent, pos, entry)?;
        handle.read_all(&self.image)
    }

    /// Create or overwrite a file with `data`.
    pub fn write_file(&mut self, path: &str, data: &[u8]) -> Result<()> {
        let resolved = path::resolve(&self.image, path)?;
        let ts = self.clock.now();
        let mut handle = match resolved.existing {
            Some((pos, entry)) => FileHandle::new(resolved.parent, pos, entry)?,
            None => {
                let entry = DirEntry::new(resolved.name, Attributes::ARCHIVE, ts.time, ts.date);
                let pos = resolved.parent.insert(&mut self.image, entry)?;
                FileHandle::new(resolved.parent, pos, entry)?
            }
        };
        handle.write_all(&mut self.image, data, self.clock.as_ref())
    }

    /// Append `data` to an existing file, or create it if missing.
    pub fn append_file(&mut self, path: &str, data: &[u8]) -> Result<()> {
        let resolved = path::resolve(&self.image, path)?;
        let ts = self.clock.now();
        let mut handle = match resolved.existing {
            Some((pos, entry)) => FileHandle::new(resolved.parent, pos, entry)?,
            None => {
                let entry = DirEntry::new(resolved.name, Attributes::ARCHIVE, ts.time, ts.date);
                let pos = resolved.parent.insert(&mut self.image, entry)?;
                FileHandle::new(resolved.parent, pos, entry)?
            }
        };
        handle.append(&mut self.image, data, self.clock.as_ref())
    }

    /// Delete a file or empty sub-directory.
    pub fn delete(&mut self, path: &str) -> Result<()> {
        let resolved = path::resolve(&self.image, path)?;
        if resolved.existing.is_none() {
            return Err(Fat12Error::NotFound(resolved.name.display()));
        }
        resolved.parent.remove(&mut self.image, &resolved.name)
    }

    /// Rename a file or directory in place, within the same parent
    /// directory.
    pub fn rename(&mut self, path: &str, new_name: &str) -> Result<()> {
        let resolved = path::resolve(&self.image, path)?;
        if resolved.existing.is_none() {
            return Err(Fat12Error::NotFound(resolved.name.display()));
        }
        let new = ShortName::normalize(new_name)?;
        resolved.parent.rename(&mut self.image, &resolved.name, new)
    }

    /// Create a new sub-directory at `path`.
    pub fn mkdir(&mut self, path: &str) -> Result<()> {
        let resolved = path::resolve(&self.image, path)?;
        if resolved.existing.is_some() {
            return Err(Fat12Error::Exists(resolved.name.display()));
        }
        let parent_cluster = match resolved.parent.location {
            DirLocation::Root => 0,
            DirLocation::Sub { start_cluster } => start_cluster,
        };

        let cluster = FatTable::alloc_one(&mut self.image)?;
        let ts = self.clock.now();
        Directory::init_sub_directory(&mut self.image, cluster, parent_cluster, ts.time, ts.date)?;

        let mut entry = DirEntry::new(resolved.name, Attributes::DIRECTORY, ts.time, ts.date);
        entry.start_cluster = cluster as u16;
        resolved.parent.insert(&mut self.image, entry)?;
        Ok(())
    }

    /// Remove an empty sub-directory at `path`.
    pub fn rmdir(&mut self, path: &str) -> Result<()> {
        let resolved = path::resolve(&self.image, path)?;
        let (_, entry) = resolved
            .existing
            .ok_or_else(|| Fat12Error::NotFound(resolved.name.display()))?;
        if !entry.is_directory() {
            return Err(Fat12Error::NotADirectory(resolved.name.display()));
        }
        resolved.parent.remove(&mut self.image, &resolved.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;

    fn fresh() -> FileSystem {
        FileSystem::format(0xDEAD_BEEF, Some("TESTVOL"))
            .unwrap()
            .with_clock(FixedClock::ymd_hms(2022, 6, 1, 12, 0, 0))
    }

    #[test]
    fn format_and_mount_roundtrip() {
        let fs = fresh();
        assert_eq!(fs.label().unwrap(), "TESTVOL");
    }

    #[test]
    fn write_then_read_file_at_root() {
        let mut fs = fresh();
        fs.write_file("HELLO.TXT", b"hi there").unwrap();
        assert_eq!(fs.read_file("HELLO.TXT").unwrap(), b"hi there");
    }

    #[test]
    fn mkdir_then_write_nested_file() {
        let mut fs = fresh();
        fs.mkdir("DOCS").unwrap();
        fs.write_file("DOCS/A.TXT", b"nested").unwrap();
        assert_eq!(fs.read_file("DOCS/A.TXT").unwrap(), b"nested");

        let listing = fs.list("DOCS").unwrap();
        let mut names: Vec<_> = listing.iter().map(|e| e.name.clone()).collect();
        names.sort();
        assert_eq!(names, vec![".".to_string(), "..".to_string(), "A.TXT".to_string()]);
    }

    #[test]
    fn set_label_rewrites_boot_sector() {
        let mut fs = fresh();
        fs.set_label("NEWLABEL").unwrap();
        assert_eq!(fs.label().unwrap(), "NEWLABEL");
    }

    #[test]
    fn rmdir_fails_when_not_empty() {
        let mut fs = fresh();
        fs.mkdir("DOCS").unwrap();
        fs.write_file("DOCS/A.TXT", b"x").unwrap();
        assert!(matches!(fs.rmdir("DOCS"), Err(Fat12Error::DirNotEmpty)));
    }

    #[test]
    fn delete_file_then_reread_fails() {
        let mut fs = fresh();
        fs.write_file("A.TXT", b"x").unwrap();
        fs.delete("A.TXT").unwrap();
        assert!(matches!(fs.read_file("A.TXT"), Err(Fat12Error::NotFound(_))));
    }

    #[test]
    fn rename_then_old_name_is_gone() {
        let mut fs = fresh();
        fs.write_file("A.TXT", b"x").unwrap();
        fs.rename("A.TXT", "B.TXT").unwrap();
        assert!(fs.read_file("A.TXT").is_err());
        assert_eq!(fs.read_file("B.TXT").unwrap(), b"x");
    }

    #[test]
    fn save_and_reopen_preserves_contents() {
        let mut fs = fresh();
        fs.write_file("A.TXT", b"persisted").unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("disk.img");
        fs.save(&path).unwrap();

        let reopened = FileSystem::open(&path).unwrap();
        assert_eq!(reopened.read_file("A.TXT").unwrap(), b"persisted");
    }

    #[test]
    fn append_file_grows_contents() {
        let mut fs = fresh();
        fs.write_file("A.TXT", b"hello ").unwrap();
        fs.append_file("A.TXT", b"world").unwrap();
        assert_eq!(fs.read_file("A.TXT").unwrap(), b"hello world");
    }

    #[test]
    fn writing_to_a_directory_path_fails() {
        let mut fs = fresh();
        fs.mkdir("DOCS").unwrap();
        assert!(matches!(
            fs.write_file("DOCS", b"x"),
            Err(Fat12Error::IsADirectory(_))
        ));
    }
}
