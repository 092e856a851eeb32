//! Boundary to the external generative synthesis engine.

use std::error::Error as StdError;

use thiserror::Error;

use crate::compose::EditRequest;

/// Opaque failure reported by an engine. Retries, quotas and translation are the
/// implementor's business; the core only carries the message and cause through.
#[derive(Debug, Error)]
#[error("synthesis engine failed: {message}")]
pub struct EngineError {
    message: String,
    #[source]
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl EngineError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        message: impl Into<String>,
        source: impl Into<Box<dyn StdError + Send + Sync>>,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// Encoded image returned by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedImage {
    pub bytes: Vec<u8>,
    pub media_type: String,
}

impl GeneratedImage {
    pub fn new(bytes: Vec<u8>, media_type: impl Into<String>) -> Self {
        Self {
            bytes,
            media_type: media_type.into(),
        }
    }
}

pub trait SynthesisEngine {
    fn generate(&self, request: &EditRequest) -> EngineResult<GeneratedImage>;
}
