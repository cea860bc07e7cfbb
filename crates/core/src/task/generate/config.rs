//! Configuration for the generate source task.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Source task emitting a fixed list of JSON records.
#[derive(PartialEq, Clone, Debug, Deserialize, Serialize, Default)]
pub struct Subscriber {
    /// The unique name / identifier of the task.
    pub name: String,
    /// Records emitted, in order, on every round. An empty list emits a single
    /// `null` payload per round.
    #[serde(default)]
    pub records: Vec<serde_json::Value>,
    /// Pause between rounds. Accepts duration strings: "100ms", "30s", "5m".
    #[serde(default, with = "humantime_serde")]
    pub interval: Option<Duration>,
    /// Number of rounds. Unlimited when an interval is set, otherwise one.
    pub count: Option<u64>,
}

impl Subscriber {
    /// Returns the number of rounds to emit, `None` meaning unlimited.
    pub fn rounds(&self) -> Option<u64> {
        match (self.count, self.interval) {
            (Some(count), _) => Some(count),
            (None, None) => Some(1),
            (None, Some(_)) => None,
        }
    }
}
