//! Scoped access to files shipped inside a package.
//!
//! An [`AssetDescriptor`] owns an open [`File`] together with the byte range
//! the asset occupies inside it. Loose files use offset 0 and the full file
//! length. Only regular files can be opened. The descriptor closes its file
//! when dropped.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// Open handle on a byte range within a file.
#[derive(Debug)]
pub struct AssetDescriptor {
    file: File,
    path: PathBuf,
    offset: u64,
    length: u64,
}

impl AssetDescriptor {
    /// Opens the whole file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be opened or its size read,
    /// or [`io::ErrorKind::InvalidInput`] when `path` is not a regular file.
    pub fn open(path: impl Into<PathBuf>) -> io::Result<Self> {
        let owned = path.into();
        let file = File::open(&owned)?;
        let metadata = file.metadata()?;
        if !metadata.is_file() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is not a regular file", owned.display()),
            ));
        }
        Ok(Self {
            file,
            path: owned,
            offset: 0,
            length: metadata.len(),
        })
    }

    /// Returns the underlying file handle.
    #[must_use]
    pub const fn file(&self) -> &File {
        &self.file
    }

    /// Returns the path the descriptor was opened from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the start of the asset within the file.
    #[must_use]
    pub const fn offset(&self) -> u64 {
        self.offset
    }

    /// Returns the asset length in bytes.
    #[must_use]
    pub const fn length(&self) -> u64 {
        self.length
    }

    /// Reads the asset contents as UTF-8 text.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if seeking or reading fails, or if the contents
    /// are not valid UTF-8.
    pub fn read_to_string(&self) -> io::Result<String> {
        let mut text = String::new();
        self.reader()?.read_to_string(&mut text)?;
        Ok(text)
    }

    /// Reads the asset as a sequence of lines without terminators.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if seeking or reading fails.
    pub fn read_lines(&self) -> io::Result<Vec<String>> {
        BufReader::new(self.reader()?).lines().collect()
    }

    fn reader(&self) -> io::Result<io::Take<&File>> {
        let mut file = &self.file;
        file.seek(SeekFrom::Start(self.offset))?;
        Ok(file.take(self.length))
    }
}
