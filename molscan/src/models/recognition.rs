use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub const STATUS_SUCCESS: &str = "SUCCESS";
pub const STATUS_TIMEOUT: &str = "timeout";

/// One engine's result for one image.
///
/// `elapsed` is absent when the engine never ran (e.g. the blob was missing);
/// `payload` is present only on success.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognitionOutcome {
    #[serde(skip)]
    pub engine: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elapsed: Option<f64>,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,
}

impl RecognitionOutcome {
    pub fn success(engine: impl Into<String>, elapsed: f64, payload: String) -> Self {
        Self {
            engine: engine.into(),
            elapsed: Some(elapsed),
            status: STATUS_SUCCESS.to_string(),
            payload: Some(payload),
        }
    }

    pub fn failure(
        engine: impl Into<String>,
        elapsed: Option<f64>,
        status: impl Into<String>,
    ) -> Self {
        Self {
            engine: engine.into(),
            elapsed,
            status: status.into(),
            payload: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == STATUS_SUCCESS
    }
}

/// Aggregate returned to callers.
///
/// Serializes flat: `{"image": "<id>", "<engine>": {...}, ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognitionResponse {
    pub image: String,
    #[serde(flatten)]
    pub engines: BTreeMap<String, RecognitionOutcome>,
}

impl RecognitionResponse {
    pub fn new(image: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            engines: BTreeMap::new(),
        }
    }

    pub fn outcome(&self, engine: &str) -> Option<&RecognitionOutcome> {
        self.engines.get(engine)
    }
}
