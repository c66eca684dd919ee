use std::io::{Read, Write};

use anyhow::{Context, Result};

use super::{ArchiveEntry, ArchiveReader, ArchiveWriter, EntryOptions};

/// An archive held entirely in memory.
///
/// It implements both [`ArchiveReader`] and [`ArchiveWriter`], which makes it handy for tests and
/// for callers that assemble archives from generated content.  Entries keep their insertion
/// order; adding an entry with an existing name adds a second entry, just like a ZIP file would.
#[derive(Clone, Debug, Default)]
pub struct MemoryArchive {
    entries: Vec<ArchiveEntry>,
    contents: Vec<Vec<u8>>,
}

impl MemoryArchive {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, entry: ArchiveEntry, content: impl Into<Vec<u8>>) {
        self.entries.push(entry);
        self.contents.push(content.into());
    }

    /// Adds a regular file with default options.
    pub fn add_file(&mut self, name: &str, content: impl Into<Vec<u8>>) {
        self.add(ArchiveEntry::file(name), content);
    }

    pub fn add_dir(&mut self, name: &str) {
        let mut entry = ArchiveEntry::file(name);
        entry.is_dir = true;
        self.add(entry, vec![]);
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|entry| entry.name == name)
    }

    pub fn entry(&self, name: &str) -> Option<&ArchiveEntry> {
        self.position(name).map(|idx| &self.entries[idx])
    }

    /// Returns the content of the first entry with the given name.
    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.position(name).map(|idx| self.contents[idx].as_slice())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.name.as_str())
    }
}

impl ArchiveReader for MemoryArchive {
    fn entries(&self) -> &[ArchiveEntry] {
        &self.entries
    }

    fn open(&mut self, name: &str) -> Result<Box<dyn Read + '_>> {
        let content = self
            .get(name)
            .with_context(|| format!("{name}: no such entry in archive"))?;
        Ok(Box::new(content))
    }
}

impl ArchiveWriter for MemoryArchive {
    fn start_entry(&mut self, name: &str, options: EntryOptions) -> Result<&mut dyn Write> {
        self.add(
            ArchiveEntry {
                name: name.to_string(),
                is_dir: false,
                compression: options.compression,
                unix_mode: options.unix_mode,
            },
            vec![],
        );
        // just pushed, so there is a last element
        Ok(self.contents.last_mut().context("entry was not added")?)
    }
}

#[cfg(test)]
mod test {
    use similar_asserts::assert_eq;

    use super::*;
    use crate::archive::Compression;

    #[test]
    fn test_write_then_read() -> Result<()> {
        let mut archive = MemoryArchive::new();
        let options = EntryOptions {
            compression: Compression::Stored,
            unix_mode: Some(0o100755),
        };
        archive.start_entry("bin/tool", options)?.write_all(b"#!/bin/sh\n")?;
        archive.start_entry("empty", EntryOptions::default())?;

        assert_eq!(archive.names().collect::<Vec<_>>(), vec!["bin/tool", "empty"]);
        assert_eq!(archive.entry("bin/tool").unwrap().options(), options);
        assert!(archive.contains("empty"));

        let mut content = String::new();
        archive.open("bin/tool")?.read_to_string(&mut content)?;
        assert_eq!(content, "#!/bin/sh\n");

        let err = archive.open("missing").err().unwrap();
        assert!(format!("{err}").contains("missing"));
        Ok(())
    }
}
