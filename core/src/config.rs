//! Engine configuration loaded from the model directory.
//!
//! The exported model ships a `tts.json` next to the ONNX files describing
//! the autoencoder and latent geometry the sessions were exported with.

use crate::error::TtsError;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Top-level `tts.json` schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Autoencoder parameters.
    pub ae: AutoEncoderConfig,
    /// Text-to-latent parameters.
    pub ttl: LatentConfig,
}

/// Autoencoder section of `tts.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoEncoderConfig {
    /// Output sample rate in Hz.
    pub sample_rate: u32,
    /// Samples per latent chunk before compression.
    pub base_chunk_size: usize,
}

/// Text-to-latent section of `tts.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LatentConfig {
    /// Compression factor applied on top of `base_chunk_size`.
    pub chunk_compress_factor: usize,
    /// Latent dimension before compression.
    pub latent_dim: usize,
}

impl EngineConfig {
    /// Load `tts.json` from a model directory.
    pub fn load(model_dir: impl AsRef<Path>) -> Result<Self, TtsError> {
        let path = model_dir.as_ref().join("tts.json");
        if !path.exists() {
            return Err(TtsError::Config(format!(
                "tts.json not found in model directory: {}",
                model_dir.as_ref().display()
            )));
        }
        let reader = BufReader::new(File::open(&path)?);
        Ok(serde_json::from_reader(reader)?)
    }

    /// Samples covered by one latent frame.
    pub fn chunk_size(&self) -> usize {
        self.ae.base_chunk_size * self.ttl.chunk_compress_factor
    }

    /// Latent dimension after chunk compression.
    pub fn compressed_latent_dim(&self) -> usize {
        self.ttl.latent_dim * self.ttl.chunk_compress_factor
    }
}
