//! Pack writer implementation.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, Write};
use std::path::Path;

use tracing::{debug, trace};

use crate::blob::BlobRecord;
use crate::errors::PackError;
use crate::frame::{FrameHeader, FrameKind, PackHeader, HEADER_SIZE};

/// Options for pack writing.
#[derive(Debug, Clone)]
pub struct WriteOptions {
    /// Whether to fsync after each append (default: false).
    pub sync: bool,
    /// Whether to create the file if it doesn't exist (default: true).
    pub create: bool,
    /// Whether to keep existing frames (default: true); otherwise the file is
    /// reset to an empty pack.
    pub append: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            sync: false,
            create: true,
            append: true,
        }
    }
}

/// Append-only writer for pack files.
pub struct PackWriter {
    file: File,
    sync: bool,
}

impl PackWriter {
    /// Opens or creates a pack file for writing.
    ///
    /// An empty file gets a fresh header. An existing file must carry a valid
    /// header; it is then positioned at its end, or truncated back to the
    /// header when `options.append` is `false`.
    ///
    /// # Errors
    ///
    /// Returns [`PackError`] if the file cannot be opened or is not a pack.
    pub fn open<P: AsRef<Path>>(path: P, options: WriteOptions) -> Result<Self, PackError> {
        let path = path.as_ref();
        let mut file = OpenOptions::new()
            .create(options.create)
            .read(true)
            .write(true)
            .open(path)?;

        let len = file.metadata()?.len();
        if len == 0 {
            file.write_all(&PackHeader::new().to_bytes())?;
            file.flush()?;
            if options.sync {
                file.sync_all()?;
            }
        } else if len < HEADER_SIZE as u64 {
            return Err(PackError::FileNotEmpty);
        } else {
            let mut header = [0u8; HEADER_SIZE];
            file.seek(io::SeekFrom::Start(0))?;
            file.read_exact(&mut header)?;
            PackHeader::from_bytes(&header)?;
            if options.append {
                file.seek(io::SeekFrom::End(0))?;
            } else {
                file.set_len(HEADER_SIZE as u64)?;
                file.seek(io::SeekFrom::Start(HEADER_SIZE as u64))?;
            }
        }
        debug!(path = %path.display(), existing = len, append = options.append, "opened pack for writing");

        Ok(Self {
            file,
            sync: options.sync,
        })
    }

    /// Appends a blob frame.
    ///
    /// # Errors
    ///
    /// Returns [`PackError`] if the payload is too large or the write fails.
    pub fn append_blob(&mut self, blob: &BlobRecord) -> Result<(), PackError> {
        trace!(cid = %blob.cid, len = blob.bytes.len(), "appending blob");
        self.append_raw(FrameKind::Blob, &blob.to_payload())
    }

    /// Appends a raw frame with the given kind and payload.
    pub fn append_raw(&mut self, kind: FrameKind, payload: &[u8]) -> Result<(), PackError> {
        let frame = FrameHeader::new(kind, payload.len())?;
        self.file.write_all(&frame.to_bytes())?;
        self.file.write_all(payload)?;
        self.file.flush()?;
        if self.sync {
            self.file.sync_all()?;
        }
        Ok(())
    }

    /// Flushes and closes the file.
    pub fn finish(mut self) -> Result<(), PackError> {
        self.file.flush()?;
        if self.sync {
            self.file.sync_all()?;
        }
        Ok(())
    }
}

impl Drop for PackWriter {
    fn drop(&mut self) {
        let _ = self.file.flush();
        if self.sync {
            let _ = self.file.sync_all();
        }
    }
}
