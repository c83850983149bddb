//! The Wikidata entity id (`Q<digits>`) used as the join key throughout
//! the pipeline.

use std::fmt;
use std::str::FromStr;

use crate::errors::PipelineError;

/// A Wikidata item id, e.g. `Q42`. Always strictly positive and never
/// wider than a non-negative `i64` — bigger values are treated as the
/// overflow bug described in the error taxonomy rather than silently
/// widened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityId(u64);

impl EntityId {
    pub const MAX: u64 = i64::MAX as u64;

    pub fn new(value: u64) -> Result<Self, PipelineError> {
        if value == 0 {
            return Err(PipelineError::InputMalformedFile {
                detail: "entity id Q0 is not a valid entity".to_string(),
            });
        }
        if value > Self::MAX {
            return Err(PipelineError::Overflow {
                detail: format!("entity id {value} exceeds the signed 64-bit range"),
            });
        }
        Ok(Self(value))
    }

    pub fn get(self) -> u64 {
        self.0
    }

    /// Parses the digits following a leading `Q`. Rejects leading
    /// zeroes so `Q0042` is not mistaken for `Q42`.
    pub fn parse_qid(raw: &str) -> Result<Self, PipelineError> {
        let digits = raw.strip_prefix('Q').ok_or_else(|| PipelineError::InputMalformedFile {
            detail: format!("entity id {raw:?} is missing the Q prefix"),
        })?;
        if digits.is_empty() || (digits.len() > 1 && digits.starts_with('0')) {
            return Err(PipelineError::InputMalformedFile {
                detail: format!("entity id {raw:?} has a malformed numeric part"),
            });
        }
        let value: u64 = digits.parse().map_err(|_| PipelineError::InputMalformedFile {
            detail: format!("entity id {raw:?} is not numeric"),
        })?;
        Self::new(value)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Q{}", self.0)
    }
}

impl FromStr for EntityId {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_qid(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_qid() {
        assert_eq!(EntityId::parse_qid("Q42").unwrap().get(), 42);
    }

    #[test]
    fn rejects_q0() {
        assert!(EntityId::parse_qid("Q0").is_err());
    }

    #[test]
    fn rejects_leading_zero() {
        assert!(EntityId::parse_qid("Q0042").is_err());
    }

    #[test]
    fn rejects_missing_prefix() {
        assert!(EntityId::parse_qid("42").is_err());
    }

    #[test]
    fn display_round_trips() {
        let id = EntityId::parse_qid("Q60").unwrap();
        assert_eq!(id.to_string(), "Q60");
    }
}
