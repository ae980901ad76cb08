//! Record types produced by the external document parser.

use std::cmp::Ordering;
use std::fmt;
use std::path::Path;

use notewise_core::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use tracing::{debug, warn};

/// Source page of a record. Numeric pages sort ascending, `Unknown` last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PageNumber {
    Number(u32),
    #[default]
    Unknown,
}

impl PageNumber {
    /// Accepts integers, numeric strings and anything else as `Unknown`.
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Number(n) => n
                .as_u64()
                .and_then(|n| u32::try_from(n).ok())
                .map(PageNumber::Number)
                .unwrap_or(PageNumber::Unknown),
            Value::String(s) => s
                .trim()
                .parse::<u32>()
                .map(PageNumber::Number)
                .unwrap_or(PageNumber::Unknown),
            _ => PageNumber::Unknown,
        }
    }
}

impl Ord for PageNumber {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (PageNumber::Number(a), PageNumber::Number(b)) => a.cmp(b),
            (PageNumber::Number(_), PageNumber::Unknown) => Ordering::Less,
            (PageNumber::Unknown, PageNumber::Number(_)) => Ordering::Greater,
            (PageNumber::Unknown, PageNumber::Unknown) => Ordering::Equal,
        }
    }
}

impl PartialOrd for PageNumber {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for PageNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageNumber::Number(n) => write!(f, "{}", n),
            PageNumber::Unknown => write!(f, "unknown"),
        }
    }
}

impl Serialize for PageNumber {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            PageNumber::Number(n) => serializer.serialize_u32(*n),
            PageNumber::Unknown => serializer.serialize_str("unknown"),
        }
    }
}

impl<'de> Deserialize<'de> for PageNumber {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(PageNumber::from_value(&value))
    }
}

/// One extracted unit from a source document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PageRecord {
    Text {
        #[serde(default)]
        page: PageNumber,
        content: String,
    },
    Figure {
        #[serde(default)]
        page: PageNumber,
        path: String,
        #[serde(default)]
        caption: String,
    },
}

impl PageRecord {
    pub fn page(&self) -> PageNumber {
        match self {
            PageRecord::Text { page, .. } | PageRecord::Figure { page, .. } => *page,
        }
    }

    /// Decode a parser output array, skipping items that are not well-formed
    /// records. A non-array input is an input error.
    pub fn decode_all(value: Value) -> Result<Vec<PageRecord>> {
        let items = match value {
            Value::Array(items) => items,
            other => {
                return Err(Error::Input(format!(
                    "page records must be a JSON array, got {}",
                    json_kind(&other)
                )))
            }
        };

        let total = items.len();
        let records: Vec<PageRecord> = items
            .into_iter()
            .enumerate()
            .filter_map(|(i, item)| match serde_json::from_value::<PageRecord>(item) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!("Skipping malformed page record #{}: {}", i, e);
                    None
                }
            })
            .collect();

        debug!("Decoded {}/{} page records", records.len(), total);
        Ok(records)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Read and merge one or more parser output files, in the given order.
pub fn load_records<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<PageRecord>> {
    let mut all = Vec::new();
    for path in paths {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let value: Value = serde_json::from_str(&raw)
            .map_err(|e| Error::Input(format!("{}: {}", path.display(), e)))?;
        all.extend(PageRecord::decode_all(value)?);
    }
    Ok(all)
}
