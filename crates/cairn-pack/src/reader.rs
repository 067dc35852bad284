//! Pack reader implementation.

use std::fs::File;
use std::io::{self, Read, Seek};
use std::path::Path;

use tracing::{debug, trace};

use crate::blob::BlobRecord;
use crate::errors::PackError;
use crate::frame::{FrameHeader, FrameKind, PackHeader, FRAME_HEADER_SIZE, HEADER_SIZE};

/// Read mode for handling truncation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadMode {
    /// Truncated frames are errors.
    #[default]
    Strict,
    /// Truncation is treated as end-of-file.
    Permissive,
}

/// Sequential reader over the frames of a pack file.
///
/// # Example
///
/// ```no_run
/// use cairn_pack::{PackReader, ReadMode};
///
/// let mut reader = PackReader::open("nodes.cnp", ReadMode::Strict)?;
/// while let Some(blob) = reader.read_blob()? {
///     println!("{} ({} bytes)", blob.cid, blob.bytes.len());
/// }
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct PackReader {
    file: File,
    mode: ReadMode,
    position: u64,
    len: u64,
}

impl PackReader {
    /// Opens a pack file and validates its header.
    ///
    /// # Errors
    ///
    /// Returns [`PackError`] if the file cannot be opened or its header is
    /// invalid.
    pub fn open<P: AsRef<Path>>(path: P, mode: ReadMode) -> Result<Self, PackError> {
        let path = path.as_ref();
        let mut file = File::open(path)?;
        let len = file.metadata()?.len();
        let mut header = [0u8; HEADER_SIZE];
        file.read_exact(&mut header).map_err(|e| {
            if e.kind() == io::ErrorKind::UnexpectedEof {
                PackError::InvalidHeader(format!("file is only {len} bytes"))
            } else {
                e.into()
            }
        })?;
        PackHeader::from_bytes(&header)?;
        debug!(path = %path.display(), len, ?mode, "opened pack for reading");
        Ok(Self {
            file,
            mode,
            position: HEADER_SIZE as u64,
            len,
        })
    }

    /// Current read offset.
    pub fn position(&self) -> u64 {
        self.position
    }

    fn truncated(&self, offset: u64) -> Result<Option<(FrameKind, Vec<u8>)>, PackError> {
        match self.mode {
            ReadMode::Permissive => {
                debug!(offset, "truncated frame treated as end of pack");
                Ok(None)
            }
            ReadMode::Strict => Err(PackError::TruncatedFrame { offset }),
        }
    }

    /// Reads the next frame of any kind.
    ///
    /// Returns `Ok(None)` at end-of-file, or at a truncated frame in
    /// permissive mode.
    pub fn read_frame(&mut self) -> Result<Option<(FrameKind, Vec<u8>)>, PackError> {
        if self.position >= self.len {
            return Ok(None);
        }
        self.file.seek(io::SeekFrom::Start(self.position))?;
        let start = self.position;

        let mut header = [0u8; FRAME_HEADER_SIZE];
        match self.file.read_exact(&mut header) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return self.truncated(start),
            Err(e) => return Err(e.into()),
        }
        let frame = FrameHeader::from_bytes(&header, start)?;

        let mut payload = vec![0u8; frame.len as usize];
        match self.file.read_exact(&mut payload) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                return self.truncated(start + FRAME_HEADER_SIZE as u64)
            }
            Err(e) => return Err(e.into()),
        }
        self.position = start + FRAME_HEADER_SIZE as u64 + u64::from(frame.len);
        trace!(offset = start, kind = ?frame.kind, len = frame.len, "read frame");
        Ok(Some((frame.kind, payload)))
    }

    /// Reads the next blob, skipping frames of unknown kinds.
    ///
    /// # Errors
    ///
    /// Returns [`PackError`] for malformed frames or payloads, and for
    /// truncation in strict mode.
    pub fn read_blob(&mut self) -> Result<Option<BlobRecord>, PackError> {
        loop {
            match self.read_frame()? {
                None => return Ok(None),
                Some((FrameKind::Blob, payload)) => {
                    return BlobRecord::from_payload(&payload).map(Some)
                }
                Some((FrameKind::Unknown(kind), _)) => {
                    trace!(kind, "skipping unknown frame");
                }
            }
        }
    }

    /// Reads every remaining blob.
    pub fn read_all(&mut self) -> Result<Vec<BlobRecord>, PackError> {
        let mut blobs = Vec::new();
        while let Some(blob) = self.read_blob()? {
            blobs.push(blob);
        }
        Ok(blobs)
    }
}
