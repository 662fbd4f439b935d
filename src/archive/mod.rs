//! # Archive
//!
//! The uploaded bundle: every file entry of a ZIP archive held in memory, in listing order.
//! An entry that fails to decompress stays listed with its read error, so only the source that
//! matches it is affected.
use std::io::Cursor;
use std::io::Read;
use std::path::Path;
use thiserror::Error;
use tracing::debug;
use tracing::warn;
use zip::result::ZipError;
use zip::ZipArchive;

/// Upper bound of the buffer reserved from an entry's declared size
const SIZE_HINT_LIMIT: u64 = 1 << 20;

/// Errors raised while opening the bundle
#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("Read archive '{0}' failed: {1}")]
    ReadError(String, #[source] std::io::Error),

    #[error("Invalid archive: {0}")]
    InvalidArchive(#[from] ZipError),
}

/// A listed entry whose content could not be read
#[derive(Error, Clone, Debug, PartialEq, Eq)]
#[error("Read entry '{name}' failed: {message}")]
pub struct UnreadableEntry {
    pub name: String,
    pub message: String,
}

/// One file of the bundle
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Path of the entry inside the archive
    pub name: String,
    pub bytes: Vec<u8>,
}

/// All file entries of a bundle; directory entries are not listed
#[derive(Clone, Debug, Default)]
pub struct Archive {
    entries: Vec<Result<ArchiveEntry, UnreadableEntry>>,
}

impl Archive {
    /// Reads a ZIP archive from memory.
    ///
    /// Fails only when the central directory cannot be read.
    pub fn from_zip_bytes(bytes: &[u8]) -> Result<Self, ArchiveError> {
        let mut zip = ZipArchive::new(Cursor::new(bytes))?;
        let mut entries = Vec::with_capacity(zip.len());
        for index in 0..zip.len() {
            let Some(name) = zip.name_for_index(index).map(str::to_owned) else {
                continue;
            };
            if name.ends_with('/') {
                continue;
            }
            let entry = read_entry(&mut zip, index)
                .map(|bytes| ArchiveEntry { name: name.to_owned(), bytes })
                .map_err(|message| UnreadableEntry { name, message });
            match &entry {
                Ok(entry) => debug!(entry = %entry.name, size = entry.bytes.len(), "Read archive entry"),
                Err(unreadable) => warn!("{}", unreadable),
            }
            entries.push(entry);
        }
        Ok(Self { entries })
    }

    /// Reads a ZIP archive from disk
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ArchiveError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)
            .map_err(|error| ArchiveError::ReadError(path.display().to_string(), error))?;
        Self::from_zip_bytes(&bytes)
    }

    /// First entry, in listing order, whose name contains `pattern` (case-sensitive).
    ///
    /// The match is made on names, so an unreadable entry is still found and reported.
    pub fn find(&self, pattern: &str) -> Option<Result<&ArchiveEntry, &UnreadableEntry>> {
        self.entries
            .iter()
            .find(|entry| entry_name(entry).contains(pattern))
            .map(Result::as_ref)
    }

    /// Entry names in listing order, readable or not
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(entry_name)
    }

    /// Entries whose content was read
    pub fn entries(&self) -> impl Iterator<Item = &ArchiveEntry> {
        self.entries.iter().filter_map(|entry| entry.as_ref().ok())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl From<Vec<ArchiveEntry>> for Archive {
    fn from(entries: Vec<ArchiveEntry>) -> Self {
        Self {
            entries: entries.into_iter().map(Ok).collect(),
        }
    }
}

fn entry_name(entry: &Result<ArchiveEntry, UnreadableEntry>) -> &str {
    match entry {
        Ok(entry) => &entry.name,
        Err(unreadable) => &unreadable.name,
    }
}

/// Decompresses one entry; encrypted entries and checksum mismatches become the message
fn read_entry(zip: &mut ZipArchive<Cursor<&[u8]>>, index: usize) -> Result<Vec<u8>, String> {
    let mut file = zip.by_index(index).map_err(|error| error.to_string())?;
    let mut bytes = Vec::with_capacity(file.size().min(SIZE_HINT_LIMIT) as usize);
    file.read_to_end(&mut bytes).map_err(|error| error.to_string())?;
    Ok(bytes)
}
