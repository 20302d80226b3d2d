use std::fmt::Display;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;
use uuid::Uuid;

/// Identifier of a single recording session.
///
/// The textual form is always the canonical lowercase 8-4-4-4-12 UUID. Every
/// id that reaches the file system has been through [`RecordingId::parse`],
/// which only accepts exactly 36 hexadecimal-and-hyphen characters, so an id
/// can never carry a path separator or a glob metacharacter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordingId {
    uuid: Uuid,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid session id {0:?}: expected 36 hexadecimal-and-hyphen characters")]
pub struct InvalidRecordingId(String);

impl InvalidRecordingId {
    pub fn input(&self) -> &str {
        &self.0
    }
}

impl RecordingId {
    pub const TEXT_LEN: usize = 36;

    pub fn new() -> Self {
        Self {
            uuid: Uuid::new_v4(),
        }
    }

    pub fn parse(s: &str) -> Result<Self, InvalidRecordingId> {
        if !has_canonical_shape(s) {
            return Err(InvalidRecordingId(truncate_for_error(s)));
        }
        let uuid = Uuid::parse_str(s).map_err(|_| InvalidRecordingId(truncate_for_error(s)))?;
        Ok(Self { uuid })
    }
}

impl Default for RecordingId {
    fn default() -> Self {
        Self::new()
    }
}

/// `xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx`, hex digits in either case.
fn has_canonical_shape(s: &str) -> bool {
    s.len() == RecordingId::TEXT_LEN
        && s.bytes().enumerate().all(|(idx, b)| match idx {
            8 | 13 | 18 | 23 => b == b'-',
            _ => b.is_ascii_hexdigit(),
        })
}

fn truncate_for_error(s: &str) -> String {
    s.chars().take(64).collect()
}

impl Display for RecordingId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.uuid)
    }
}

impl FromStr for RecordingId {
    type Err = InvalidRecordingId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<RecordingId> for Uuid {
    fn from(value: RecordingId) -> Self {
        value.uuid
    }
}

impl Serialize for RecordingId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(&self.uuid)
    }
}

impl<'de> Deserialize<'de> for RecordingId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Self::parse(&value).map_err(serde::de::Error::custom)
    }
}
