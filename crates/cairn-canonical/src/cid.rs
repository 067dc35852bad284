use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest as Sha2Digest, Sha256};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use crate::validation::ValidationError;

/// Domain separator prepended to canonical bytes before hashing: `b"cairn:node:v1\0"`.
pub const NODE_DOMAIN_SEPARATOR: &[u8] = b"cairn:node:v1\0";

/// Digest width in bytes for every supported algorithm.
pub const DIGEST_LEN: usize = 32;

/// Supported digest algorithms for content identifiers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CidAlg {
    /// BLAKE3-256 (the cairn default).
    #[default]
    Blake3,
    /// SHA-256.
    Sha256,
}

impl CidAlg {
    /// Textual tag used in `{alg}:{hex}` strings.
    pub fn tag(self) -> &'static str {
        match self {
            CidAlg::Blake3 => "blake3",
            CidAlg::Sha256 => "sha-256",
        }
    }

    /// Wire byte used by the binary encoder and pack files.
    pub fn to_byte(self) -> u8 {
        match self {
            CidAlg::Blake3 => 0x01,
            CidAlg::Sha256 => 0x02,
        }
    }

    /// Decodes a wire byte.
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x01 => Some(CidAlg::Blake3),
            0x02 => Some(CidAlg::Sha256),
            _ => None,
        }
    }

    /// Parses a textual tag.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "blake3" => Some(CidAlg::Blake3),
            "sha-256" => Some(CidAlg::Sha256),
            _ => None,
        }
    }
}

impl fmt::Display for CidAlg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for CidAlg {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CidAlg::from_tag(s).ok_or_else(|| ValidationError::PatternMismatch {
            field: "cid_alg",
            value: s.to_string(),
        })
    }
}

/// Content identifier: algorithm tag plus a 256-bit digest of canonical bytes.
///
/// A CID carries no meaning beyond pointing at exactly one normal-form byte
/// sequence. Ordering is by algorithm, then digest bytes.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Cid {
    alg: CidAlg,
    digest: [u8; DIGEST_LEN],
}

impl Cid {
    /// Wraps an existing digest.
    pub fn new(alg: CidAlg, digest: [u8; DIGEST_LEN]) -> Self {
        Self { alg, digest }
    }

    /// Computes the CID of canonical node bytes.
    ///
    /// Formula: `H(domain_separator || canonical_bytes)`.
    pub fn of_canonical_bytes(alg: CidAlg, bytes: &[u8]) -> Self {
        let digest = match alg {
            CidAlg::Blake3 => {
                let mut hasher = blake3::Hasher::new();
                hasher.update(NODE_DOMAIN_SEPARATOR);
                hasher.update(bytes);
                *hasher.finalize().as_bytes()
            }
            CidAlg::Sha256 => {
                let mut hasher = Sha256::new();
                hasher.update(NODE_DOMAIN_SEPARATOR);
                hasher.update(bytes);
                let mut out = [0u8; DIGEST_LEN];
                out.copy_from_slice(&hasher.finalize());
                out
            }
        };
        Self { alg, digest }
    }

    /// Returns `true` if `bytes` hash to this CID.
    pub fn matches(&self, bytes: &[u8]) -> bool {
        Self::of_canonical_bytes(self.alg, bytes) == *self
    }

    /// Digest algorithm.
    pub fn alg(&self) -> CidAlg {
        self.alg
    }

    /// Raw digest bytes.
    pub fn digest(&self) -> &[u8; DIGEST_LEN] {
        &self.digest
    }

    /// Lowercase hex digest without the algorithm tag.
    pub fn hex(&self) -> String {
        hex::encode(self.digest)
    }

    /// Parses `{alg}:{64 lowercase hex}`.
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        static PATTERN: OnceLock<Regex> = OnceLock::new();
        let re = PATTERN
            .get_or_init(|| Regex::new(r"^(blake3|sha-256):([0-9a-f]{64})$").expect("invalid regex"));
        let mismatch = || ValidationError::PatternMismatch {
            field: "cid",
            value: value.to_string(),
        };
        let caps = re.captures(value).ok_or_else(mismatch)?;
        let alg = CidAlg::from_tag(&caps[1]).ok_or_else(mismatch)?;
        let mut digest = [0u8; DIGEST_LEN];
        hex::decode_to_slice(&caps[2], &mut digest).map_err(|_| mismatch())?;
        Ok(Self { alg, digest })
    }
}

impl fmt::Display for Cid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.alg, self.hex())
    }
}

impl fmt::Debug for Cid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cid({self})")
    }
}

impl FromStr for Cid {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Cid::parse(s)
    }
}

impl Serialize for Cid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Cid {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Cid::parse(&s).map_err(serde::de::Error::custom)
    }
}
