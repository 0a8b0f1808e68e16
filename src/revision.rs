use std::{fmt, hash::Hash, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// MediaWiki's compact `TS_MW` timestamp layout.
const WIKI_TIMESTAMP: &str = "%Y%m%d%H%M%S";
const ISO_TIMESTAMP: &str = "%Y-%m-%dT%H:%M:%SZ";

/// One saved version of a page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Revision {
    #[serde(rename = "revid")]
    pub revision_id: u64,
    pub size: u64,
    pub timestamp: DateTime<Utc>,
}

impl Revision {
    pub fn new(revision_id: u64, size: u64, timestamp: DateTime<Utc>) -> Self {
        Self {
            revision_id,
            size,
            timestamp,
        }
    }

    pub fn formatted_timestamp(&self, format: TimestampFormat) -> TimestampValue {
        match format {
            TimestampFormat::Wiki => {
                TimestampValue::Text(self.timestamp.format(WIKI_TIMESTAMP).to_string())
            }
            TimestampFormat::IsoString => {
                TimestampValue::Text(self.timestamp.format(ISO_TIMESTAMP).to_string())
            }
            TimestampFormat::Unix => TimestampValue::Unix(self.timestamp.timestamp()),
        }
    }
}

impl Hash for Revision {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.revision_id.hash(state);
    }
}

impl PartialEq for Revision {
    fn eq(&self, other: &Self) -> bool {
        self.revision_id == other.revision_id
    }
}

impl Eq for Revision {}

/// How many revisions to retrieve for a single article.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RevisionSpec {
    #[default]
    All,
    Count(u64),
}

impl RevisionSpec {
    pub fn limit(self) -> Option<u64> {
        match self {
            RevisionSpec::All => None,
            RevisionSpec::Count(n) => Some(n),
        }
    }
}

impl From<u64> for RevisionSpec {
    fn from(n: u64) -> Self {
        RevisionSpec::Count(n)
    }
}

impl FromStr for RevisionSpec {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s == "all" {
            return Ok(RevisionSpec::All);
        }
        s.parse::<u64>()
            .map(RevisionSpec::Count)
            .map_err(|_| Error::InvalidRevisionSpec(s.to_string()))
    }
}

impl fmt::Display for RevisionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RevisionSpec::All => f.write_str("all"),
            RevisionSpec::Count(n) => write!(f, "{n}"),
        }
    }
}

/// Revision specification for every member of a collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectionSpec {
    Uniform(RevisionSpec),
    PerMember(Vec<RevisionSpec>),
}

impl Default for CollectionSpec {
    fn default() -> Self {
        CollectionSpec::Uniform(RevisionSpec::All)
    }
}

impl From<RevisionSpec> for CollectionSpec {
    fn from(spec: RevisionSpec) -> Self {
        CollectionSpec::Uniform(spec)
    }
}

impl From<Vec<RevisionSpec>> for CollectionSpec {
    fn from(specs: Vec<RevisionSpec>) -> Self {
        CollectionSpec::PerMember(specs)
    }
}

/// Optional time bounds for a revision fetch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeRange {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl TimeRange {
    pub fn new(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, timestamp: &DateTime<Utc>) -> bool {
        self.start.is_none_or(|start| *timestamp >= start)
            && self.end.is_none_or(|end| *timestamp <= end)
    }
}

/// Everything a source needs to answer a revision history request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RevisionQuery {
    pub limit: Option<u64>,
    pub range: TimeRange,
}

impl RevisionQuery {
    pub fn new(spec: RevisionSpec, range: TimeRange) -> Self {
        Self {
            limit: spec.limit(),
            range,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimestampFormat {
    Wiki,
    #[default]
    IsoString,
    Unix,
}

impl FromStr for TimestampFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "wiki" => Ok(TimestampFormat::Wiki),
            "isostring" => Ok(TimestampFormat::IsoString),
            "unix" => Ok(TimestampFormat::Unix),
            other => Err(Error::UnknownTimestampFormat(other.to_string())),
        }
    }
}

impl fmt::Display for TimestampFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TimestampFormat::Wiki => "wiki",
            TimestampFormat::IsoString => "isostring",
            TimestampFormat::Unix => "unix",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(untagged)]
pub enum TimestampValue {
    Text(String),
    Unix(i64),
}

impl TimestampValue {
    pub fn as_unix(&self) -> Option<i64> {
        match self {
            TimestampValue::Unix(secs) => Some(*secs),
            TimestampValue::Text(_) => None,
        }
    }
}

impl From<TimestampValue> for serde_json::Value {
    fn from(value: TimestampValue) -> Self {
        match value {
            TimestampValue::Text(s) => serde_json::Value::String(s),
            TimestampValue::Unix(secs) => serde_json::Value::from(secs),
        }
    }
}
