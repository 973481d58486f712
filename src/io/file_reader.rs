//! Range reads from local files.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::Mutex;

use bytes::Bytes;

use super::RangeReader;
use crate::error::IoError;

/// Local-file implementation of [`RangeReader`].
///
/// The file size is read once on open. Reads seek and fill a fresh buffer,
/// so only the requested range is ever held in memory.
#[derive(Debug)]
pub struct FileRangeReader {
    file: Mutex<File>,
    size: u64,
    identifier: String,
}

impl FileRangeReader {
    /// Open a slide file for range reads.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, IoError> {
        let path = path.as_ref();
        let identifier = path.display().to_string();

        let file = File::open(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                IoError::NotFound(identifier.clone())
            } else {
                IoError::Read {
                    path: identifier.clone(),
                    message: e.to_string(),
                }
            }
        })?;

        let size = file
            .metadata()
            .map_err(|e| IoError::Read {
                path: identifier.clone(),
                message: e.to_string(),
            })?
            .len();

        Ok(Self {
            file: Mutex::new(file),
            size,
            identifier,
        })
    }

    fn read_error(&self, message: impl ToString) -> IoError {
        IoError::Read {
            path: self.identifier.clone(),
            message: message.to_string(),
        }
    }
}

impl RangeReader for FileRangeReader {
    fn read_exact_at(&self, offset: u64, len: usize) -> Result<Bytes, IoError> {
        let in_bounds = offset
            .checked_add(len as u64)
            .map(|end| end <= self.size)
            .unwrap_or(false);
        if !in_bounds {
            return Err(IoError::RangeOutOfBounds {
                offset,
                requested: len as u64,
                size: self.size,
            });
        }

        let mut file = self
            .file
            .lock()
            .map_err(|_| self.read_error("file handle lock poisoned"))?;

        let mut buf = vec![0u8; len];
        file.seek(SeekFrom::Start(offset))
            .map_err(|e| self.read_error(e))?;
        file.read_exact(&mut buf).map_err(|e| self.read_error(e))?;

        Ok(Bytes::from(buf))
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn identifier(&self) -> &str {
        &self.identifier
    }
}
