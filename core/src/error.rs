//! Error types for synthesis operations.

use thiserror::Error;

/// Errors that can occur while loading models or synthesizing speech.
#[derive(Debug, Error)]
pub enum TtsError {
    /// Model directory or one of the ONNX files is missing.
    #[error("model not found: {0}")]
    ModelNotFound(String),

    /// `tts.json` or `unicode_indexer.json` is missing or malformed.
    #[error("configuration error: {0}")]
    Config(String),

    /// Voice style file is missing or its tensors have unexpected shapes.
    #[error("voice style error: {0}")]
    Style(String),

    /// Caller passed input the engine cannot synthesize.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Requested execution provider is not available.
    #[error("unsupported device: {0}")]
    UnsupportedDevice(String),

    /// ONNX Runtime failure (session build or inference).
    #[error("inference failed: {0}")]
    Inference(#[from] ort::Error),

    /// Tensor reshape failure.
    #[error("tensor shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),

    /// WAV encode/decode failure.
    #[error("audio error: {0}")]
    Audio(#[from] hound::Error),

    /// File I/O failure.
    #[error("file error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parse failure.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
