//! Sequenced output filenames
//!
//! Output artifacts are named `<prefix><index>.<extension>`. Each call re-scans
//! the directory and hands back the path one past the highest index present.

use crate::{Error, Result};
use std::fs;
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const MAX_CREATE_ATTEMPTS: usize = 16;

/// A `(prefix, extension)` pair identifying one numbering sequence.
///
/// Both halves are compared literally, so a `.` in the prefix only ever
/// matches a `.` in the filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilenamePattern {
    prefix: String,
    extension: String,
}

impl FilenamePattern {
    pub fn new(prefix: impl Into<String>, extension: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            extension: extension.into(),
        }
    }

    /// Index encoded in `name`, or `None` if the name is not part of this sequence.
    ///
    /// The whole name must be `<prefix><digits>.<extension>`; leading zeros are
    /// allowed and digit runs that overflow `u64` are treated as non-members.
    pub fn index_of(&self, name: &str) -> Option<u64> {
        let rest = name.strip_prefix(self.prefix.as_str())?;
        let digits = rest
            .strip_suffix(self.extension.as_str())?
            .strip_suffix('.')?;

        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }

        digits.parse().ok()
    }

    pub fn file_name(&self, index: u64) -> String {
        format!("{}{}.{}", self.prefix, index, self.extension)
    }

    /// Reject prefixes and extensions that would place the file outside the
    /// scanned directory.
    fn validate(&self) -> Result<()> {
        for (kind, value) in [("prefix", &self.prefix), ("extension", &self.extension)] {
            if value.chars().any(std::path::is_separator) {
                return Err(Error::InvalidInput(format!(
                    "Filename {} must not contain a path separator: '{}'",
                    kind, value
                )));
            }
        }
        Ok(())
    }

    /// Scan `directory` and return the next free index for this pattern.
    fn next_index(&self, directory: &Path) -> Result<u64> {
        let mut highest: Option<u64> = None;

        for entry in fs::read_dir(directory)? {
            let entry = entry?;
            let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
                continue;
            };
            if let Some(index) = self.index_of(&name) {
                highest = Some(highest.map_or(index, |h| h.max(index)));
            }
        }

        match highest {
            None => Ok(1),
            Some(index) => self.successor(index, directory),
        }
    }

    fn successor(&self, index: u64, directory: &Path) -> Result<u64> {
        index.checked_add(1).ok_or_else(|| {
            Error::Invariant(format!(
                "Output index overflow for {} in {}",
                self.file_name(index),
                directory.display()
            ))
        })
    }
}

fn ensure_directory(directory: &Path) -> Result<()> {
    if !directory.exists() {
        fs::create_dir_all(directory)?;
        debug!("Created output directory: {}", directory.display());
    }
    Ok(())
}

/// Return the next unused `<prefix><n>.<extension>` path inside `directory`.
///
/// Creates `directory` (and parents) when missing. Nothing is reserved: two
/// callers scanning before either writes will get the same path.
pub fn next_path(directory: &Path, prefix: &str, extension: &str) -> Result<PathBuf> {
    let pattern = FilenamePattern::new(prefix, extension);
    pattern.validate()?;
    ensure_directory(directory)?;

    let index = pattern.next_index(directory)?;
    Ok(directory.join(pattern.file_name(index)))
}

/// Write `data` to the next sequenced path without overwriting anything.
///
/// The file is opened with `create_new`; if another writer claimed the index
/// first, the directory is re-scanned and the next index tried.
pub fn write_sequenced(
    directory: &Path,
    prefix: &str,
    extension: &str,
    data: &[u8],
) -> Result<PathBuf> {
    claim_and_write(
        directory,
        prefix,
        extension,
        |path| {
            fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(path)
        },
        |file| file.write_all(data),
    )
}

fn claim_and_write<O, W>(
    directory: &Path,
    prefix: &str,
    extension: &str,
    mut open: O,
    write: W,
) -> Result<PathBuf>
where
    O: FnMut(&Path) -> io::Result<fs::File>,
    W: FnOnce(&mut fs::File) -> io::Result<()>,
{
    let pattern = FilenamePattern::new(prefix, extension);
    pattern.validate()?;
    ensure_directory(directory)?;

    let mut last_tried: Option<u64> = None;

    for attempt in 1..=MAX_CREATE_ATTEMPTS {
        let mut index = pattern.next_index(directory)?;
        // A collision the scan cannot see (e.g. case-folded names) must still advance.
        if let Some(last) = last_tried {
            if index <= last {
                index = pattern.successor(last, directory)?;
            }
        }
        let path = directory.join(pattern.file_name(index));

        match open(&path) {
            Ok(mut file) => {
                if let Err(e) = write(&mut file) {
                    drop(file);
                    if let Err(cleanup) = fs::remove_file(&path) {
                        warn!(
                            "Failed to remove partial output {}: {}",
                            path.display(),
                            cleanup
                        );
                    }
                    return Err(e.into());
                }
                return Ok(path);
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                warn!(
                    "{} was claimed concurrently (attempt {}/{}), rescanning",
                    path.display(),
                    attempt,
                    MAX_CREATE_ATTEMPTS
                );
                last_tried = Some(index);
            }
            Err(e) => return Err(e.into()),
        }
    }

    Err(Error::Invariant(format!(
        "Could not claim an output filename for prefix '{}' in {} after {} attempts",
        prefix,
        directory.display(),
        MAX_CREATE_ATTEMPTS
    )))
}
