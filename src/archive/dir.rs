//! Plain directory trees, read as if they were an archive.
//!
//! This is what makes it possible to build a signed .apk straight from a directory of files
//! without creating an unsigned archive first.

use std::{
    fs::{self, File},
    io::Read,
    os::unix::fs::PermissionsExt,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use log::debug;

use super::{ArchiveEntry, ArchiveReader, Compression};

/// Reads the regular files below a directory.
///
/// Entry names are the paths relative to the root, with '/' separators.  Directories themselves
/// are not listed.  Symlinks are followed.
#[derive(Debug)]
pub struct DirectoryReader {
    root: PathBuf,
    entries: Vec<ArchiveEntry>,
}

fn collect_entries(root: &Path, dir: &Path, entries: &mut Vec<ArchiveEntry>) -> Result<()> {
    let mut children = fs::read_dir(dir)
        .with_context(|| format!("reading directory {}", dir.display()))?
        .collect::<std::io::Result<Vec<_>>>()
        .with_context(|| format!("reading directory {}", dir.display()))?;
    children.sort_by_key(|child| child.file_name());

    for child in children {
        let path = child.path();
        let file_type = child
            .file_type()
            .with_context(|| format!("inspecting {}", path.display()))?;

        if file_type.is_dir() {
            collect_entries(root, &path, entries)?;
            continue;
        }

        let metadata =
            fs::metadata(&path).with_context(|| format!("inspecting {}", path.display()))?;
        let relative = path.strip_prefix(root)?;
        let name = relative
            .components()
            .map(|component| component.as_os_str().to_str())
            .collect::<Option<Vec<_>>>()
            .with_context(|| format!("{}: file name is not valid UTF-8", path.display()))?
            .join("/");

        debug!("# {name}");
        entries.push(ArchiveEntry {
            name,
            is_dir: metadata.is_dir(),
            compression: Compression::Deflated,
            unix_mode: Some(metadata.permissions().mode()),
        });
    }

    Ok(())
}

impl DirectoryReader {
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        let mut entries = vec![];
        collect_entries(&root, &root, &mut entries)?;
        Ok(Self { root, entries })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ArchiveReader for DirectoryReader {
    fn entries(&self) -> &[ArchiveEntry] {
        &self.entries
    }

    fn open(&mut self, name: &str) -> Result<Box<dyn Read + '_>> {
        let path = self.root.join(name);
        let file = File::open(&path).with_context(|| format!("opening {}", path.display()))?;
        Ok(Box::new(file))
    }
}
