use crate::errors::PackError;

/// Pack file magic bytes: `b"CNP1"`.
pub const MAGIC: &[u8; 4] = b"CNP1";

/// Current pack format version: `0x0001`.
pub const VERSION: u16 = 0x0001;

/// Header size in bytes.
pub const HEADER_SIZE: usize = 16;

/// Frame header size in bytes.
pub const FRAME_HEADER_SIZE: usize = 8;

/// Maximum payload size: 16 MiB.
pub const MAX_PAYLOAD_SIZE: u32 = 16 * 1024 * 1024;

/// Frame kind byte for blob frames.
pub const FRAME_KIND_BLOB: u8 = 0x01;

/// Pack file header (16 bytes, little-endian fields).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackHeader {
    /// Format version.
    pub version: u16,
    /// Reserved flags (must be 0).
    pub flags: u16,
}

impl PackHeader {
    /// Header for the current format version.
    pub fn new() -> Self {
        Self {
            version: VERSION,
            flags: 0,
        }
    }

    /// Serializes the header.
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut bytes = [0u8; HEADER_SIZE];
        bytes[0..4].copy_from_slice(MAGIC);
        bytes[4..6].copy_from_slice(&self.version.to_le_bytes());
        bytes[6..8].copy_from_slice(&self.flags.to_le_bytes());
        bytes
    }

    /// Parses and validates a header.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PackError> {
        if bytes.len() < HEADER_SIZE {
            return Err(PackError::InvalidHeader(format!(
                "header too short: {} bytes",
                bytes.len()
            )));
        }
        if &bytes[0..4] != MAGIC {
            return Err(PackError::InvalidHeader(format!(
                "invalid magic: {:?}, expected {:?}",
                &bytes[0..4],
                MAGIC
            )));
        }
        let version = u16::from_le_bytes([bytes[4], bytes[5]]);
        if version != VERSION {
            return Err(PackError::InvalidHeader(format!(
                "unsupported version: 0x{version:04x}, expected 0x{VERSION:04x}"
            )));
        }
        let flags = u16::from_le_bytes([bytes[6], bytes[7]]);
        if flags != 0 {
            return Err(PackError::InvalidHeader(format!(
                "non-zero flags: 0x{flags:04x}"
            )));
        }
        if bytes[8..HEADER_SIZE].iter().any(|b| *b != 0) {
            return Err(PackError::InvalidHeader(
                "non-zero reserved bytes".to_string(),
            ));
        }
        Ok(Self { version, flags })
    }
}

impl Default for PackHeader {
    fn default() -> Self {
        Self::new()
    }
}

/// Frame kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    /// Canonical bytes keyed by their CID.
    Blob,
    /// Unknown kind; readers skip it.
    Unknown(u8),
}

impl FrameKind {
    /// Creates a kind from its byte.
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            FRAME_KIND_BLOB => FrameKind::Blob,
            _ => FrameKind::Unknown(byte),
        }
    }

    /// Byte value of this kind.
    pub fn to_byte(self) -> u8 {
        match self {
            FrameKind::Blob => FRAME_KIND_BLOB,
            FrameKind::Unknown(b) => b,
        }
    }
}

/// Frame header: kind byte, three reserved zero bytes, u32 LE payload length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Frame kind.
    pub kind: FrameKind,
    /// Payload length in bytes.
    pub len: u32,
}

impl FrameHeader {
    /// Creates a header for a payload of `len` bytes.
    pub fn new(kind: FrameKind, len: usize) -> Result<Self, PackError> {
        let too_large = || PackError::PayloadTooLarge {
            size: len as u64,
            max: MAX_PAYLOAD_SIZE,
        };
        let len = u32::try_from(len).map_err(|_| too_large())?;
        if len > MAX_PAYLOAD_SIZE {
            return Err(too_large());
        }
        Ok(Self { kind, len })
    }

    /// Serializes the frame header.
    pub fn to_bytes(&self) -> [u8; FRAME_HEADER_SIZE] {
        let mut bytes = [0u8; FRAME_HEADER_SIZE];
        bytes[0] = self.kind.to_byte();
        bytes[4..8].copy_from_slice(&self.len.to_le_bytes());
        bytes
    }

    /// Parses a frame header found at `offset`.
    pub fn from_bytes(bytes: &[u8; FRAME_HEADER_SIZE], offset: u64) -> Result<Self, PackError> {
        if bytes[1..4] != [0u8; 3] {
            return Err(PackError::InvalidFrame {
                offset,
                reason: "non-zero reserved bytes".to_string(),
            });
        }
        let len = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
        if len > MAX_PAYLOAD_SIZE {
            return Err(PackError::InvalidFrame {
                offset,
                reason: format!("payload size {len} exceeds maximum {MAX_PAYLOAD_SIZE}"),
            });
        }
        Ok(Self {
            kind: FrameKind::from_byte(bytes[0]),
            len,
        })
    }
}
