// Typed errors with thiserror. Domain failures are contained by the controller;
// only malformed input from JS is surfaced across the boundary.

use thiserror::Error;
use wasm_bindgen::JsValue;

/// Engine error types.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid event {name}: {message}")]
    InvalidEvent { name: String, message: String },

    /// Expected and frequent: the estimator did not report all torso points.
    #[error("Torso landmarks unavailable")]
    LandmarksUnavailable,

    #[error("Selected index {index} out of range for {len} candidates")]
    IndexOutOfRange { index: i64, len: usize },

    #[error("Capture resource error: {0}")]
    CaptureResource(String),

    #[error("Catalog query failed: {0}")]
    CatalogQueryFailed(String),

    #[error("Render error: {0}")]
    Render(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::Serialization(err.to_string())
    }
}

impl From<EngineError> for JsValue {
    fn from(err: EngineError) -> Self {
        JsValue::from_str(&err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = EngineError::IndexOutOfRange { index: 2, len: 1 };
        assert_eq!(
            err.to_string(),
            "Selected index 2 out of range for 1 candidates"
        );
    }

    #[test]
    fn serde_errors_convert() {
        let err: EngineError = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert!(matches!(err, EngineError::Serialization(_)));
    }
}
