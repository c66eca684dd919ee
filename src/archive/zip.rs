//! ZIP (.jar/.apk) archives.

use std::{
    fs::File,
    io::{BufReader, Read, Seek, Write},
    path::Path,
};

use anyhow::{ensure, Context, Result};
use log::trace;
use zip::{write::SimpleFileOptions, CompressionMethod, DateTime, ZipArchive, ZipWriter};

use super::{ArchiveEntry, ArchiveReader, ArchiveWriter, Compression, EntryOptions};

fn compression_from_zip(method: CompressionMethod) -> Compression {
    match method {
        CompressionMethod::Stored => Compression::Stored,
        // other methods can't be read, see ZipArchiveReader::open()
        _ => Compression::Deflated,
    }
}

fn compression_to_zip(compression: Compression) -> CompressionMethod {
    match compression {
        Compression::Stored => CompressionMethod::Stored,
        Compression::Deflated => CompressionMethod::Deflated,
    }
}

/// Reads entries from a ZIP file.
pub struct ZipArchiveReader<R: Read + Seek> {
    archive: ZipArchive<R>,
    entries: Vec<ArchiveEntry>,
}

impl<R: Read + Seek> std::fmt::Debug for ZipArchiveReader<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // archive doesn't impl Debug for all R
        f.debug_struct("ZipArchiveReader")
            .field("entries", &self.entries)
            .finish()
    }
}

impl ZipArchiveReader<BufReader<File>> {
    pub fn open_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
        Self::new(BufReader::new(file)).with_context(|| format!("reading {}", path.display()))
    }
}

impl<R: Read + Seek> ZipArchiveReader<R> {
    /// Reads the central directory of the archive.  Entry contents are only read on
    /// [`ArchiveReader::open()`].
    pub fn new(reader: R) -> Result<Self> {
        let mut archive = ZipArchive::new(reader).context("reading zip central directory")?;

        let mut entries = Vec::with_capacity(archive.len());
        for idx in 0..archive.len() {
            let file = archive
                .by_index_raw(idx)
                .with_context(|| format!("reading zip entry #{idx}"))?;
            trace!("zip entry {:?} ({:?})", file.name(), file.compression());
            entries.push(ArchiveEntry {
                name: file.name().to_string(),
                is_dir: file.is_dir(),
                compression: compression_from_zip(file.compression()),
                unix_mode: file.unix_mode(),
            });
        }

        Ok(Self { archive, entries })
    }
}

impl<R: Read + Seek> ArchiveReader for ZipArchiveReader<R> {
    fn entries(&self) -> &[ArchiveEntry] {
        &self.entries
    }

    /// Opens the decompressed content of an entry.  Only stored and deflated entries can be
    /// read.
    fn open(&mut self, name: &str) -> Result<Box<dyn Read + '_>> {
        let idx = self
            .archive
            .index_for_name(name)
            .with_context(|| format!("{name}: no such entry in archive"))?;
        let method = self
            .archive
            .by_index_raw(idx)
            .with_context(|| format!("opening zip entry {name}"))?
            .compression();
        ensure!(
            matches!(
                method,
                CompressionMethod::Stored | CompressionMethod::Deflated
            ),
            "unsupported compression method {method:?} for zip entry {name}"
        );

        let file = self
            .archive
            .by_index(idx)
            .with_context(|| format!("opening zip entry {name}"))?;
        Ok(Box::new(file))
    }
}

/// Writes a new ZIP file.
///
/// Modification times are fixed to the DOS epoch so that the same input always produces the
/// same archive.
pub struct ZipArchiveWriter<W: Write + Seek> {
    writer: ZipWriter<W>,
}

impl<W: Write + Seek> std::fmt::Debug for ZipArchiveWriter<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZipArchiveWriter").finish_non_exhaustive()
    }
}

impl<W: Write + Seek> ZipArchiveWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            writer: ZipWriter::new(inner),
        }
    }

    /// Writes the central directory and returns the underlying writer.
    pub fn finish(self) -> Result<W> {
        self.writer
            .finish()
            .context("writing zip central directory")
    }
}

impl<W: Write + Seek> ArchiveWriter for ZipArchiveWriter<W> {
    fn start_entry(&mut self, name: &str, options: EntryOptions) -> Result<&mut dyn Write> {
        let mut file_options = SimpleFileOptions::default()
            .compression_method(compression_to_zip(options.compression))
            .last_modified_time(DateTime::default());
        if let Some(mode) = options.unix_mode {
            file_options = file_options.unix_permissions(mode);
        }

        self.writer
            .start_file(name, file_options)
            .with_context(|| format!("adding zip entry {name}"))?;
        Ok(&mut self.writer)
    }
}
