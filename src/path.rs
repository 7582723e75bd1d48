//! Path Resolver: turns a `/`-separated path into a directory + entry.
//!
//! Pulled out into its own module so `fs.rs` isn't repeating a
//! component-at-a-time directory walk in every operation.

use crate::dir::{Directory, DirLocation, SlotPos};
use crate::entry::{DirEntry, ShortName};
use crate::error::{Fat12Error, Result};
use crate::geometry::FIRST_DATA_CLUSTER;
use crate::sector::SectorDevice;

/// Split a path into normalized 8.3 components. `.` components are
/// dropped; `..` components are kept for [`resolve`] to pop against. An
/// empty or all-`.`/`/` path yields an empty list, meaning the root.
fn split(path: &str) -> Result<Vec<Component>> {
    let mut out = Vec::new();
    for raw in path.split('/') {
        if raw.is_empty() || raw == "." {
            continue;
        }
        if raw == ".." {
            out.push(Component::Parent);
            continue;
        }
        out.push(Component::Named(ShortName::normalize(raw)?));
    }
    Ok(out)
}

enum Component {
    Named(ShortName),
    Parent,
}

/// The outcome of resolving a path down to its final component.
pub struct Resolved {
    /// The directory that directly contains (or would contain) the final
    /// component.
    pub parent: Directory,
    /// The final path component's normalized name.
    pub name: ShortName,
    /// The final component's slot and entry, if it already exists.
    pub existing: Option<(SlotPos, DirEntry)>,
    /// Whether the input path ended in `/`, marking the target as required
    /// to be a directory.
    pub requires_directory: bool,
}

/// Walk `path` from the root, descending into each named directory
/// component. The last component is not required to exist; everything
/// before it must, and must be a directory.
pub fn resolve(device: &dyn SectorDevice, path: &str) -> Result<Resolved> {
    let requires_directory = path.ends_with('/');
    let components = split(path)?;
    let Some((last, dirs)) = components.split_last() else {
        return Err(Fat12Error::BadName("path has no final component".into()));
    };

    let mut current = Directory::root();
    for component in dirs {
        current = step(device, &current, component)?;
    }

    let name = match last {
        Component::Named(n) => *n,
        Component::Parent => {
            current = step(device, &current, last)?;
            return Ok(Resolved {
                existing: current.iter(device)?.into_iter().next(),
                name: ShortName::normalize(".").unwrap_or(ShortName {
                    base: *b".       ",
                    ext: *b"   ",
                }),
                parent: current,
                requires_directory: true,
            });
        }
    };

    let existing = current.lookup(device, &name)?;
    if requires_directory {
        if let Some((_, entry)) = &existing {
            if !entry.is_directory() {
                return Err(Fat12Error::NotADirectory(name.display()));
            }
        }
    }
    Ok(Resolved {
        parent: current,
        name,
        existing,
        requires_directory,
    })
}

/// Descend through one directory component, failing `NotFound` or
/// `NotADirectory` as appropriate.
fn step(device: &dyn SectorDevice, current: &Directory, component: &Component) -> Result<Directory> {
    match component {
        Component::Parent => match current.location {
            DirLocation::Root => Ok(Directory::root()),
            DirLocation::Sub { start_cluster } => {
                let (_, dotdot) = current
                    .iter(device)?
                    .into_iter()
                    .nth(1)
                    .ok_or_else(|| Fat12Error::CorruptDirectory("missing .. entry".into()))?;
                let _ = start_cluster;
                if dotdot.start_cluster as u32 == 0 {
                    Ok(Directory::root())
                } else {
                    Ok(Directory::sub(dotdot.start_cluster as u32))
                }
            }
        },
        Component::Named(name) => {
            let (_, entry) = current
                .lookup(device, name)?
                .ok_or_else(|| Fat12Error::NotFound(name.display()))?;
            if !entry.is_directory() {
                return Err(Fat12Error::NotADirectory(name.display()));
            }
            if (entry.start_cluster as u32) < FIRST_DATA_CLUSTER {
                return Err(Fat12Error::CorruptDirectory(format!(
                    "directory {} has no start cluster",
                    name.display()
                )));
            }
            Ok(Directory::sub(entry.start_cluster as u32))
        }
    }
}

/// Resolve a path to an existing directory, failing `NotFound`/
/// `NotADirectory` if it isn't one. Used by listing/mkdir/rmdir.
pub fn resolve_directory(device: &dyn SectorDevice, path: &str) -> Result<Directory> {
    let components = split(path)?;
    let mut current = Directory::root();
    for component in &components {
        current = step(device, &current, component)?;
    }
    Ok(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::Attributes;
    use crate::fat::FatTable;
    use crate::sector::Image;

    fn mkdir(img: &mut Image, parent: &Directory, name: &str) -> u32 {
        let cluster = FatTable::alloc_one(img).unwrap();
        let parent_cluster = match parent.location {
            DirLocation::Root => 0,
            DirLocation::Sub { start_cluster } => start_cluster,
        };
        Directory::init_sub_directory(img, cluster, parent_cluster, 0, 0).unwrap();
        let mut entry = DirEntry::new(ShortName::normalize(name).unwrap(), Attributes::DIRECTORY, 0, 0);
        entry.start_cluster = cluster as u16;
        parent.insert(img, entry).unwrap();
        cluster
    }

    #[test]
    fn empty_path_is_an_error_but_root_resolves_via_resolve_directory() {
        let img = Image::new_blank();
        assert!(resolve_directory(&img, "").is_ok());
        assert!(resolve_directory(&img, "/").is_ok());
    }

    #[test]
    fn resolves_nested_directories() {
        let mut img = Image::new_blank();
        let root = Directory::root();
        mkdir(&mut img, &root, "A");
        let a = resolve_directory(&img, "A").unwrap();
        mkdir(&mut img, &a, "B");

        let resolved = resolve(&img, "A/B/FILE.TXT").unwrap();
        assert_eq!(resolved.name.display(), "FILE.TXT");
        assert!(resolved.existing.is_none());
    }

    #[test]
    fn missing_intermediate_directory_fails_not_found() {
        let img = Image::new_blank();
        assert!(matches!(
            resolve(&img, "NOPE/FILE.TXT"),
            Err(Fat12Error::NotFound(_))
        ));
    }

    #[test]
    fn intermediate_file_component_fails_not_a_directory() {
        let mut img = Image::new_blank();
        let root = Directory::root();
        let entry = DirEntry::new(ShortName::normalize("A.TXT").unwrap(), Attributes::ARCHIVE, 0, 0);
        root.insert(&mut img, entry).unwrap();

        assert!(matches!(
            resolve(&img, "A.TXT/FILE.TXT"),
            Err(Fat12Error::NotADirectory(_))
        ));
    }

    #[test]
    fn dotdot_from_subdirectory_returns_to_root() {
        let mut img = Image::new_blank();
        let root = Directory::root();
        mkdir(&mut img, &root, "A");

        let resolved = resolve_directory(&img, "A/..").unwrap();
        assert!(matches!(resolved.location, DirLocation::Root));
    }
}
