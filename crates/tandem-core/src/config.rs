//! Queue options.
//!
//! Options are plain serde data so they can come from a JSON blob:
//!
//! ```ignore
//! let options = QueueOptions::from_json(r#"{ "timeout": 5000, "label": "billing" }"#)?;
//! assert_eq!(options.timeout(), Duration::from_secs(5));
//! ```
//!
//! Unknown keys are kept in `extra` and ignored by the queue itself.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::QueueError;

pub const DEFAULT_TIMEOUT_MS: u64 = 60_000;

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueOptions {
    /// Per-task timeout in milliseconds.
    #[serde(rename = "timeout", default = "default_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl QueueOptions {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout_ms: duration_to_ms(timeout),
            extra: BTreeMap::new(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self, QueueError> {
        let options: QueueOptions = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn validate(&self) -> Result<(), QueueError> {
        if self.timeout_ms == 0 {
            return Err(QueueError::InvalidTimeout);
        }
        Ok(())
    }
}

impl Default for QueueOptions {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            extra: BTreeMap::new(),
        }
    }
}

pub(crate) fn duration_to_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
