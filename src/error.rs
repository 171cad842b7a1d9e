// Typed errors with thiserror. Surface meaningful messages to JS.
// Nothing here is fatal to the page: callers log and degrade to "show less".

use thiserror::Error;

/// Engine error types.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Footprint source error: {0}")]
    Source(String),

    #[error("Marker creation failed for '{name}': {message}")]
    MarkerCreation { name: String, message: String },

    #[error("Map SDK error: {0}")]
    Sdk(String),

    #[error("Unknown map layer: {0}")]
    UnknownLayer(String),
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::Serialization(err.to_string())
    }
}

impl From<EngineError> for wasm_bindgen::JsValue {
    fn from(err: EngineError) -> Self {
        wasm_bindgen::JsValue::from_str(&err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = EngineError::InvalidConfig("missing field".to_string());
        assert!(err.to_string().contains("missing field"));
    }

    #[test]
    fn marker_error_names_the_footprint() {
        let err = EngineError::MarkerCreation {
            name: "West Lake".to_string(),
            message: "AMap is not defined".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("West Lake"));
        assert!(text.contains("AMap is not defined"));
    }

    #[test]
    fn serde_errors_convert() {
        let err: EngineError = serde_json::from_str::<Vec<u8>>("{")
            .map_err(EngineError::from)
            .unwrap_err();
        assert!(matches!(err, EngineError::Serialization(_)));
    }
}
