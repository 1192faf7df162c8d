use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU32, Ordering};

use lazy_static::lazy_static;
use rand::Rng;
use serde::{Deserialize, Deserializer, Serialize};
use time::OffsetDateTime;

const ID_LEN: usize = 24;
const COUNTER_MASK: u32 = 0x00ff_ffff;

lazy_static! {
    static ref PROCESS_UNIQUE: [u8; 5] = rand::thread_rng().gen();
    static ref COUNTER: AtomicU32 = AtomicU32::new(rand::thread_rng().gen::<u32>() & COUNTER_MASK);
}

/// 12-byte record id rendered as 24 lowercase hex characters.
///
/// Layout: 4 bytes of unix seconds, 5 bytes fixed per process, 3 bytes of a
/// wrapping counter. Ids produced by one process therefore sort in creation
/// order until the counter wraps within a single second.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, sqlx::Type)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct ObjectId(String);

#[derive(Debug, thiserror::Error)]
#[error("invalid object id {0:?}")]
pub struct InvalidObjectId(pub String);

impl ObjectId {
    pub fn new() -> Self {
        let secs = OffsetDateTime::now_utc().unix_timestamp() as u32;
        let count = COUNTER.fetch_add(1, Ordering::Relaxed) & COUNTER_MASK;

        let mut bytes = [0u8; 12];
        bytes[..4].copy_from_slice(&secs.to_be_bytes());
        bytes[4..9].copy_from_slice(&*PROCESS_UNIQUE);
        bytes[9..].copy_from_slice(&count.to_be_bytes()[1..]);

        let mut hex = String::with_capacity(ID_LEN);
        for b in bytes {
            hex.push_str(&format!("{b:02x}"));
        }
        ObjectId(hex)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl FromStr for ObjectId {
    type Err = InvalidObjectId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.len() == ID_LEN && s.bytes().all(|b| b.is_ascii_hexdigit()) {
            Ok(ObjectId(s.to_ascii_lowercase()))
        } else {
            Err(InvalidObjectId(s.to_string()))
        }
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ObjectId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
