//! Document identifiers
//!
//! A [`DocumentId`] is 12 bytes:
//!
//! | Bytes | Content |
//! |-------|---------|
//! | 0..4  | Unix seconds, big-endian |
//! | 4..9  | random bytes from the OS CSPRNG |
//! | 9..12 | counter, big-endian, wraps at 2^24 |
//!
//! Byte-wise ordering follows creation time at one-second granularity.
//! Within the same second ordering is unspecified.
//!
//! The counter lives in an explicit [`IdGenerator`]. `DocumentId::new()` uses
//! a process-wide generator constructed lazily on first use; callers that
//! need isolated sequences build their own.

use crate::error::{Error, Result};
use once_cell::sync::Lazy;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Length of a document id in bytes
pub const ID_LEN: usize = 12;

/// Length of the canonical text form
pub const ID_HEX_LEN: usize = ID_LEN * 2;

const COUNTER_MASK: u32 = 0x00FF_FFFF;

static GLOBAL_GENERATOR: Lazy<IdGenerator> = Lazy::new(IdGenerator::new);

/// 12-byte, approximately time-ordered document identifier
///
/// `Eq`, `Ord` and `Hash` are byte-wise. The all-zero id is [`DocumentId::EMPTY`]
/// and means "not yet assigned".
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct DocumentId([u8; ID_LEN]);

impl DocumentId {
    /// The unassigned id
    pub const EMPTY: DocumentId = DocumentId([0; ID_LEN]);

    /// Generate a fresh id from the process-wide generator
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        GLOBAL_GENERATOR.next_id()
    }

    /// Create an id from raw bytes
    pub const fn from_bytes(bytes: [u8; ID_LEN]) -> Self {
        DocumentId(bytes)
    }

    /// Raw bytes of this id
    pub const fn as_bytes(&self) -> &[u8; ID_LEN] {
        &self.0
    }

    /// True for the all-zero id
    pub fn is_empty(&self) -> bool {
        self.0 == [0; ID_LEN]
    }

    /// Unix seconds embedded in the id
    pub fn timestamp(&self) -> u32 {
        u32::from_be_bytes([self.0[0], self.0[1], self.0[2], self.0[3]])
    }

    /// Counter value embedded in the id
    pub fn counter(&self) -> u32 {
        u32::from_be_bytes([0, self.0[9], self.0[10], self.0[11]])
    }

    /// Parse the 24-character hex form
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if the text is not exactly 24 hex characters.
    pub fn parse(text: &str) -> Result<Self> {
        if text.len() != ID_HEX_LEN {
            return Err(Error::invalid_argument(format!(
                "document id must be {} hex characters, got {}",
                ID_HEX_LEN,
                text.len()
            )));
        }
        let mut bytes = [0u8; ID_LEN];
        hex::decode_to_slice(text, &mut bytes).map_err(|e| {
            Error::invalid_argument(format!("document id '{}' is not hex: {}", text, e))
        })?;
        Ok(DocumentId(bytes))
    }

    /// Parse without an error value
    pub fn try_parse(text: &str) -> Option<Self> {
        Self::parse(text).ok()
    }

    /// Canonical lowercase hex form
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DocumentId({})", self.to_hex())
    }
}

impl FromStr for DocumentId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for DocumentId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for DocumentId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        DocumentId::parse(&text).map_err(serde::de::Error::custom)
    }
}

/// Source of document ids
///
/// Holds the 24-bit counter shared by every id it produces. Increments are a
/// single atomic `fetch_add`, so one generator can be used from many threads.
#[derive(Debug)]
pub struct IdGenerator {
    counter: AtomicU32,
}

impl IdGenerator {
    /// Create a generator with a random counter seed
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self::with_seed(OsRng.next_u32())
    }

    /// Create a generator starting at `seed` (masked to 24 bits)
    pub fn with_seed(seed: u32) -> Self {
        IdGenerator {
            counter: AtomicU32::new(seed & COUNTER_MASK),
        }
    }

    /// Produce an id stamped with the current time
    pub fn next_id(&self) -> DocumentId {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        self.id_at(u32::try_from(secs).unwrap_or(u32::MAX))
    }

    /// Produce an id stamped with the given Unix seconds
    pub fn id_at(&self, unix_secs: u32) -> DocumentId {
        let mut bytes = [0u8; ID_LEN];
        bytes[0..4].copy_from_slice(&unix_secs.to_be_bytes());
        OsRng.fill_bytes(&mut bytes[4..9]);
        let counter = self.next_counter();
        bytes[9..12].copy_from_slice(&counter.to_be_bytes()[1..4]);
        DocumentId(bytes)
    }

    fn next_counter(&self) -> u32 {
        // u32 wraps at 2^32, a multiple of 2^24, so masking wraps cleanly
        self.counter.fetch_add(1, Ordering::Relaxed) & COUNTER_MASK
    }
}
