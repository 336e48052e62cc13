//! Newtypes and parsers for candidate identity and output identifiers.

use core::fmt;
use core::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::errors::CoreError;

fn is_lower_hex_len(s: &str, n: usize) -> bool {
    s.len() == n && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

fn is_ts_utc_z(s: &str) -> bool {
    // "YYYY-MM-DDTHH:MM:SSZ" (length 20)
    let b = s.as_bytes();
    if b.len() != 20 {
        return false;
    }
    b.iter().enumerate().all(|(i, c)| match i {
        4 | 7 => *c == b'-',
        10 => *c == b'T',
        13 | 16 => *c == b':',
        19 => *c == b'Z',
        _ => c.is_ascii_digit(),
    })
}

/// Stable identity of one candidate row. Non-empty, trimmed, no control characters.
///
/// Allocations are compared by sets of these, never by row position.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "String", into = "String"))]
pub struct CandidateId(String);

impl CandidateId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CandidateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for CandidateId {
    type Err = CoreError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let t = s.trim();
        if t.is_empty() || t.chars().any(char::is_control) {
            return Err(CoreError::InvalidId);
        }
        Ok(Self(t.to_string()))
    }
}

impl TryFrom<String> for CandidateId {
    type Error = CoreError;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<CandidateId> for String {
    fn from(id: CandidateId) -> Self {
        id.0
    }
}

/// Group key shared by the mutually exclusive variants of one project.
/// Any string is accepted; the empty key is a group like any other.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GroupKey(String);

impl GroupKey {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// "RES:" + 64-hex (lowercase)
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ResultId(String);

impl ResultId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResultId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ResultId {
    type Err = CoreError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rest = s.strip_prefix("RES:").ok_or(CoreError::InvalidId)?;
        if is_lower_hex_len(rest, 64) {
            Ok(Self(s.to_string()))
        } else {
            Err(CoreError::InvalidHex)
        }
    }
}

/// "RUN:" + "<YYYY-MM-DDTHH:MM:SSZ>" + ":" + 64-hex (lowercase)
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RunId(String);

impl RunId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Timestamp portion of the id.
    pub fn timestamp(&self) -> &str {
        &self.0[4..24]
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for RunId {
    type Err = CoreError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rest = s.strip_prefix("RUN:").ok_or(CoreError::InvalidId)?;
        // The timestamp itself contains ':' so split at its fixed width.
        if rest.len() != 20 + 1 + 64 || !rest.is_char_boundary(20) {
            return Err(CoreError::InvalidId);
        }
        let (ts, tail) = rest.split_at(20);
        if !is_ts_utc_z(ts) {
            return Err(CoreError::InvalidTimestamp);
        }
        let hash = tail.strip_prefix(':').ok_or(CoreError::InvalidId)?;
        if !is_lower_hex_len(hash, 64) {
            return Err(CoreError::InvalidHex);
        }
        Ok(Self(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidate_id_trims_and_rejects_blank() {
        let id: CandidateId = "  P-01 ".parse().unwrap();
        assert_eq!(id.as_str(), "P-01");
        assert_eq!("".parse::<CandidateId>(), Err(CoreError::InvalidId));
        assert_eq!("   ".parse::<CandidateId>(), Err(CoreError::InvalidId));
        assert_eq!("a\nb".parse::<CandidateId>(), Err(CoreError::InvalidId));
        assert_eq!("P\u{2013}1".parse::<CandidateId>().unwrap().as_str(), "P\u{2013}1");
    }

    #[test]
    fn result_id_shape() {
        let hex = "a".repeat(64);
        assert!(format!("RES:{hex}").parse::<ResultId>().is_ok());
        assert!(format!("RES:{}", "A".repeat(64)).parse::<ResultId>().is_err());
        assert!(hex.parse::<ResultId>().is_err());
    }

    #[test]
    fn run_id_shape_and_timestamp() {
        let hex = "0123456789abcdef".repeat(4);
        let id: RunId = format!("RUN:2025-08-12T10:00:00Z:{hex}").parse().unwrap();
        assert_eq!(id.timestamp(), "2025-08-12T10:00:00Z");
        assert_eq!(
            format!("RUN:2025-08-12 10:00:00Z:{hex}").parse::<RunId>(),
            Err(CoreError::InvalidTimestamp)
        );
        assert!(format!("RUN:2025-08-12T10:00:00Z-{hex}").parse::<RunId>().is_err());
    }
}
