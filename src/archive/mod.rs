//! Archive containers.
//!
//! Signing only needs a small slice of what an archive format offers: a listing of entries, a way
//! to read an entry's (decompressed) content, and a way to add new entries.  [`ArchiveReader`] and
//! [`ArchiveWriter`] describe that slice.  Implementations are provided for ZIP files
//! ([`zip`]), plain directory trees ([`dir`], read-only) and in-memory archives ([`memory`]).

pub mod dir;
pub mod memory;
pub mod zip;

use std::io::{Read, Write};

use anyhow::Result;

/// How the content of an entry is stored.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Compression {
    Stored,
    #[default]
    Deflated,
}

/// Metadata about one entry of an archive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// The path of the entry inside of the archive, with '/' separators
    pub name: String,
    pub is_dir: bool,
    pub compression: Compression,
    /// Unix permission bits, including the file type bits if the archive records them
    pub unix_mode: Option<u32>,
}

impl ArchiveEntry {
    /// A regular file entry with default options.
    pub fn file(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_dir: false,
            compression: Compression::default(),
            unix_mode: None,
        }
    }

    /// The options to use for writing an entry with the same attributes.
    pub fn options(&self) -> EntryOptions {
        EntryOptions {
            compression: self.compression,
            unix_mode: self.unix_mode,
        }
    }
}

/// Options for a new entry in an [`ArchiveWriter`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EntryOptions {
    pub compression: Compression,
    pub unix_mode: Option<u32>,
}

/// Read access to the entries of an archive.
pub trait ArchiveReader {
    /// Lists the entries of the archive, in archive order.
    fn entries(&self) -> &[ArchiveEntry];

    /// Opens the content of the named entry for reading.  The returned reader yields the
    /// decompressed bytes.
    fn open(&mut self, name: &str) -> Result<Box<dyn Read + '_>>;

    fn contains(&self, name: &str) -> bool {
        self.entries().iter().any(|entry| entry.name == name)
    }
}

/// Write access to an archive being created.
pub trait ArchiveWriter {
    /// Starts a new entry and returns the sink for its content.  The entry is complete when the
    /// next one is started or the archive is finished.
    fn start_entry(&mut self, name: &str, options: EntryOptions) -> Result<&mut dyn Write>;
}
