//! Error kinds surfaced by the engine.
//!
//! One flat enum rather than a per-module hierarchy, since this crate
//! exposes a single error surface to its callers.

use thiserror::Error;

/// The partition a [`Fat12Error`] falls into: user input, capacity,
/// corruption, or lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    UserInput,
    Capacity,
    Corruption,
    Lifecycle,
}

/// All errors the engine can surface.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Fat12Error {
    #[error("path not found: {0}")]
    NotFound(String),

    #[error("entry already exists: {0}")]
    Exists(String),

    #[error("invalid 8.3 name: {0}")]
    BadName(String),

    #[error("not a directory: {0}")]
    NotADirectory(String),

    #[error("is a directory: {0}")]
    IsADirectory(String),

    #[error("bad buffer size: expected {expected}, got {actual}")]
    BadSize { expected: usize, actual: usize },

    #[error("no free space on volume")]
    NoSpace,

    #[error("root directory is full")]
    DirFull,

    #[error("directory is not empty")]
    DirNotEmpty,

    #[error("image is not a valid FAT12 image: {0}")]
    BadImage(String),

    #[error("unsupported geometry: {0}")]
    UnsupportedGeometry(String),

    #[error("corrupt directory: {0}")]
    CorruptDirectory(String),

    #[error("bad cluster chain: {0}")]
    BadChain(String),

    #[error("bad cluster number: {0}")]
    BadCluster(u32),

    #[error("sector index out of range: {0}")]
    OutOfRange(usize),

    #[error("handle invalidated")]
    Invalidated,
}

impl Fat12Error {
    /// The partition this error kind belongs to.
    pub fn class(&self) -> ErrorClass {
        use Fat12Error::*;
        match self {
            NotFound(_) | Exists(_) | BadName(_) | NotADirectory(_) | IsADirectory(_)
            | BadSize { .. } => ErrorClass::UserInput,
            NoSpace | DirFull | DirNotEmpty => ErrorClass::Capacity,
            BadImage(_) | UnsupportedGeometry(_) | CorruptDirectory(_) | BadChain(_)
            | BadCluster(_) | OutOfRange(_) => ErrorClass::Corruption,
            Invalidated => ErrorClass::Lifecycle,
        }
    }
}

pub type Result<T> = core::result::Result<T, Fat12Error>;
