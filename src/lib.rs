//! A library for reading, creating, and mutating FAT12 file systems on
//! 1.44 MB floppy images.
//!
//! The engine is single-threaded and synchronous (no locks, no async): an
//! [`fs::FileSystem`] owns its [`sector::Image`] outright, and every
//! operation is a plain `&self`/`&mut self` call. Callers needing
//! concurrent access are expected to serialize it themselves.

pub mod clock;
pub mod dir;
pub mod entry;
pub mod error;
pub mod fat;
pub mod file;
pub mod format;
pub mod fs;
pub mod geometry;
pub mod path;
pub mod sector;

pub use clock::{Clock, DosTimestamp, FixedClock, SystemClock};
pub use entry::{Attributes, DirEntry, ShortName};
pub use error::{ErrorClass, Fat12Error, Result};
pub use fs::{DirListing, FileSystem};
pub use sector::Image;
