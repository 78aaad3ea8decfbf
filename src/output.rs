//! Output record types and encoding
//!
//! One `Grab` per connection-run, serialized as a single JSON line:
//! `{"ip": .., "domain": .., "data": {<probe name>: <result>, ..}}` with
//! empty `ip`/`domain` omitted and `data` keyed in execution order.

use crate::target::ScanTarget;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

/// Outcome of one probe module against one connection
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeResult {
    Success(serde_json::Value),
    Error(String),
}

impl ProbeResult {
    pub fn is_error(&self) -> bool {
        matches!(self, ProbeResult::Error(_))
    }
}

impl From<crate::Result<serde_json::Value>> for ProbeResult {
    fn from(result: crate::Result<serde_json::Value>) -> Self {
        match result {
            Ok(payload) => ProbeResult::Success(payload),
            Err(e) => ProbeResult::Error(e.to_string()),
        }
    }
}

/// Aggregated record for one target-run, immutable once built
#[derive(Debug, Serialize)]
pub struct Grab {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub ip: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub domain: String,
    #[serde(serialize_with = "serialize_data")]
    pub data: Vec<(String, ProbeResult)>,
}

impl Grab {
    pub fn new(target: &ScanTarget, data: Vec<(String, ProbeResult)>) -> Self {
        Self {
            ip: target.ip_string(),
            domain: target.domain_string(),
            data,
        }
    }

    /// Serialize to one JSON record (no trailing newline)
    pub fn encode(&self) -> crate::Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}

// serde_json maps don't keep insertion order; the pair list does, and
// serializes as a plain JSON object here.
fn serialize_data<S: Serializer>(
    data: &[(String, ProbeResult)],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(data.len()))?;
    for (name, result) in data {
        map.serialize_entry(name, result)?;
    }
    map.end()
}
