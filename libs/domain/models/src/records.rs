//! Sortable record types. Every record round-trips through a single
//! line of ASCII text, `<key> <value>` separated by one space with no
//! embedded newline, which is what lets `qrank-core-sort`'s external
//! sorter handle sitelinks, pageviews and per-entity counts with the
//! same generic code.

use std::fmt;

use crate::entity::EntityId;
use crate::errors::PipelineError;

fn split_once_space(line: &str) -> Option<(&str, &str)> {
    line.split_once(' ')
}

/// A `<wiki>.<site>/<normalised title>` join key produced by both the
/// sitelink extractor (C2) and the pageview extractor (C3).
pub fn join_key(wiki: &str, site: &str, normalised_title: &str) -> String {
    format!("{wiki}.{site}/{normalised_title}")
}

/// One sitelink: a title key mapped to the entity it belongs to.
/// Emitted by C2, consumed after sorting by C6.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SitelinkRecord {
    pub key: String,
    pub entity: EntityId,
}

impl SitelinkRecord {
    pub fn encode(&self) -> String {
        format!("{} {}", self.key, self.entity)
    }

    pub fn decode(line: &str) -> Result<Self, PipelineError> {
        let (key, value) = split_once_space(line).ok_or_else(|| PipelineError::InputMalformedFile {
            detail: format!("sitelink record {line:?} has no key/value separator"),
        })?;
        let entity = EntityId::parse_qid(value)?;
        Ok(Self { key: key.to_string(), entity })
    }
}

/// One title's aggregated pageview count for a single month, keyed the
/// same way as `SitelinkRecord`. Emitted by C3.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageviewRecord {
    pub key: String,
    pub views: u64,
}

impl PageviewRecord {
    pub fn encode(&self) -> String {
        format!("{} {}", self.key, self.views)
    }

    pub fn decode(line: &str) -> Result<Self, PipelineError> {
        let (key, value) = split_once_space(line).ok_or_else(|| PipelineError::InputMalformedFile {
            detail: format!("pageview record {line:?} has no key/value separator"),
        })?;
        let views: u64 = value.parse().map_err(|_| PipelineError::InputMalformedFile {
            detail: format!("pageview record {line:?} has a non-numeric count"),
        })?;
        Ok(Self { key: key.to_string(), views })
    }
}

/// The join of sitelinks and pageviews onto a single entity: the sum
/// of every title's views across every wiki that links to it. Emitted
/// by C6, consumed by C7.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PerEntityViews {
    pub entity: EntityId,
    pub views: u64,
}

impl PerEntityViews {
    pub fn encode(&self) -> String {
        format!("{} {}", self.entity, self.views)
    }

    pub fn decode(line: &str) -> Result<Self, PipelineError> {
        let (key, value) = split_once_space(line).ok_or_else(|| PipelineError::InputMalformedFile {
            detail: format!("per-entity views record {line:?} has no key/value separator"),
        })?;
        let entity = EntityId::parse_qid(key)?;
        let views: u64 = value.parse().map_err(|_| PipelineError::InputMalformedFile {
            detail: format!("per-entity views record {line:?} has a non-numeric count"),
        })?;
        Ok(Self { entity, views })
    }
}

/// One row of the final published CSV: an entity and its aggregated
/// view count, in descending-view order (ties broken by entity id
/// ascending). The row's position in the file *is* its rank; no
/// ordinal is stored alongside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RankRecord {
    pub entity: EntityId,
    pub views: u64,
}

impl fmt::Display for RankRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.entity, self.views)
    }
}
