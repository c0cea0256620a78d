//! Supertonic Core - ONNX Runtime inference engine for Supertonic text-to-speech.
//!
//! ## Module Organization
//!
//! ### Engine
//! - [`engine`] - The four-session synthesis pipeline and the [`Synthesizer`] seam
//! - [`config`] - Engine configuration loaded from `tts.json`
//! - [`style`] - Voice style descriptors and batch stacking
//!
//! ### Preprocessing
//! - [`text`] - Unicode normalization, codepoint indexing, chunking
//! - [`latent`] - Gaussian latent sampling and length masks
//!
//! ### Output
//! - [`audio`] - Duration trimming and WAV encoding

/// Engine configuration (`tts.json` schema)
pub mod config;

/// The ONNX synthesis pipeline
pub mod engine;

/// Error types
pub mod error;

/// Gaussian latent sampling and length masks
pub mod latent;

/// Voice style loading
pub mod style;

/// Text preprocessing and filename sanitization
pub mod text;

/// Waveform trimming and WAV encoding
pub mod audio;

// Re-exports for the common path
pub use config::EngineConfig;
pub use engine::{Synthesis, SynthesisOptions, Synthesizer, TextToSpeech};
pub use error::TtsError;
pub use style::VoiceStyle;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Language tags the synthesis front-end accepts.
pub const AVAILABLE_LANGS: &[&str] = &["en", "ko"];
