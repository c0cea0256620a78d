//! The Supertonic synthesis pipeline.
//!
//! The exported model is four ONNX sessions driven in sequence:
//!
//! ```text
//! text ids ─► duration_predictor ─► durations
//! text ids ─► text_encoder ──────► text_emb
//! noise ───► vector_estimator (total_step iterations) ─► latent
//! latent ──► vocoder ────────────► waveform batch
//! ```
//!
//! [`TextToSpeech`] owns the sessions; [`Synthesizer`] is the seam the
//! entry points program against so handlers stay testable without a model.

use crate::config::EngineConfig;
use crate::error::TtsError;
use crate::latent::sample_noisy_latent;
use crate::style::VoiceStyle;
use crate::text::{chunk_text, TextProcessor, MAX_CHUNK_CHARS};
use log::{debug, info};
use ndarray::{Array, Array2, Array3};
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Value;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Knobs shared by both synthesis paths.
#[derive(Debug, Clone, Copy)]
pub struct SynthesisOptions {
    /// Number of denoising iterations (more steps, higher fidelity).
    pub total_step: usize,
    /// Speech speed multiplier applied to predicted durations.
    pub speed: f32,
    /// Silence inserted between chunks in single-utterance synthesis, seconds.
    pub silence_duration: f32,
}

impl Default for SynthesisOptions {
    fn default() -> Self {
        Self {
            total_step: 5,
            speed: 1.05,
            silence_duration: 0.3,
        }
    }
}

impl SynthesisOptions {
    fn validate(&self) -> Result<(), TtsError> {
        if self.total_step == 0 {
            return Err(TtsError::InvalidInput("total_step must be at least 1".into()));
        }
        if self.speed <= 0.0 {
            return Err(TtsError::InvalidInput("speed must be positive".into()));
        }
        if self.silence_duration < 0.0 {
            return Err(TtsError::InvalidInput(
                "silence_duration must not be negative".into(),
            ));
        }
        Ok(())
    }
}

/// A synthesized waveform batch with per-item durations in seconds.
///
/// Rows are padded to the longest item; trim with
/// [`crate::audio::trim_to_durations`] before writing.
#[derive(Debug, Clone)]
pub struct Synthesis {
    /// Waveform batch, `[bsz, T]`.
    pub wav: Array2<f32>,
    /// True duration of each row in seconds.
    pub durations: Vec<f32>,
}

/// The seam between the entry points and the inference engine.
pub trait Synthesizer: Send {
    /// Output sample rate in Hz.
    fn sample_rate(&self) -> u32;

    /// Synthesize one utterance, chunking long text and joining chunks
    /// with `silence_duration` seconds of silence.
    fn synthesize(
        &mut self,
        text: &str,
        lang: &str,
        style: &VoiceStyle,
        opts: &SynthesisOptions,
    ) -> Result<Synthesis, TtsError>;

    /// Synthesize N independent utterances in one padded batch.
    fn synthesize_batch(
        &mut self,
        texts: &[String],
        langs: &[String],
        style: &VoiceStyle,
        opts: &SynthesisOptions,
    ) -> Result<Synthesis, TtsError>;
}

/// The ONNX-backed Supertonic engine.
#[derive(Debug)]
pub struct TextToSpeech {
    config: EngineConfig,
    text_processor: TextProcessor,
    duration_predictor: Session,
    text_encoder: Session,
    vector_estimator: Session,
    vocoder: Session,
    sample_rate: u32,
}

impl TextToSpeech {
    /// Load the engine from an exported model directory.
    ///
    /// The directory must contain `tts.json`, `unicode_indexer.json` and the
    /// four session files (`duration_predictor.onnx`, `text_encoder.onnx`,
    /// `vector_estimator.onnx`, `vocoder.onnx`).
    pub fn load(model_dir: impl AsRef<Path>, use_gpu: bool) -> Result<Self, TtsError> {
        if use_gpu {
            return Err(TtsError::UnsupportedDevice(
                "GPU execution is not supported by this build; run on CPU".into(),
            ));
        }

        let model_dir = model_dir.as_ref();
        if !model_dir.is_dir() {
            return Err(TtsError::ModelNotFound(model_dir.display().to_string()));
        }

        let config = EngineConfig::load(model_dir)?;
        let text_processor = TextProcessor::load(model_dir.join("unicode_indexer.json"))?;

        // Singleton init, safe to call more than once.
        let _ = ort::init().commit();

        info!("loading Supertonic sessions from {}", model_dir.display());
        let start = Instant::now();
        let duration_predictor = load_session(model_dir.join("duration_predictor.onnx"))?;
        let text_encoder = load_session(model_dir.join("text_encoder.onnx"))?;
        let vector_estimator = load_session(model_dir.join("vector_estimator.onnx"))?;
        let vocoder = load_session(model_dir.join("vocoder.onnx"))?;
        info!(
            "sessions ready in {:.2}s (sample rate {} Hz)",
            start.elapsed().as_secs_f32(),
            config.ae.sample_rate
        );

        let sample_rate = config.ae.sample_rate;
        Ok(Self {
            config,
            text_processor,
            duration_predictor,
            text_encoder,
            vector_estimator,
            vocoder,
            sample_rate,
        })
    }

    /// One padded batch through all four sessions.
    fn infer(
        &mut self,
        texts: &[String],
        style: &VoiceStyle,
        opts: &SynthesisOptions,
    ) -> Result<Synthesis, TtsError> {
        let bsz = texts.len();
        if style.batch_size() != bsz {
            return Err(TtsError::InvalidInput(format!(
                "style batch size ({}) must match text count ({bsz})",
                style.batch_size()
            )));
        }

        let (text_ids, text_mask) = self.text_processor.encode(texts)?;

        let text_ids_value = Value::from_array(text_ids)?;
        let text_mask_value = Value::from_array(text_mask)?;
        let style_dp_value = Value::from_array(style.dp.clone())?;

        // Predict per-item durations, then apply the speed factor.
        let dp_outputs = self.duration_predictor.run(ort::inputs! {
            "text_ids" => &text_ids_value,
            "style_dp" => &style_dp_value,
            "text_mask" => &text_mask_value
        })?;
        let (_, duration_data) = dp_outputs["duration"].try_extract_tensor::<f32>()?;
        let durations: Vec<f32> = duration_data.iter().map(|&d| d / opts.speed).collect();
        drop(dp_outputs);

        // Encode text.
        let style_ttl_value = Value::from_array(style.ttl.clone())?;
        let enc_outputs = self.text_encoder.run(ort::inputs! {
            "text_ids" => &text_ids_value,
            "style_ttl" => &style_ttl_value,
            "text_mask" => &text_mask_value
        })?;
        let (emb_shape, emb_data) = enc_outputs["text_emb"].try_extract_tensor::<f32>()?;
        let text_emb = Array3::from_shape_vec(
            (
                emb_shape[0] as usize,
                emb_shape[1] as usize,
                emb_shape[2] as usize,
            ),
            emb_data.to_vec(),
        )?;
        drop(enc_outputs);

        // Denoise from Gaussian noise over total_step iterations.
        let (mut xt, latent_mask) = sample_noisy_latent(
            &durations,
            self.sample_rate,
            self.config.chunk_size(),
            self.config.compressed_latent_dim(),
        );
        let total_step_array = Array::from_elem(bsz, opts.total_step as f32);
        let latent_mask_value = Value::from_array(latent_mask)?;
        let text_emb_value = Value::from_array(text_emb)?;

        debug!("denoising batch of {bsz} over {} steps", opts.total_step);
        for step in 0..opts.total_step {
            let xt_value = Value::from_array(xt)?;
            let current_step_value = Value::from_array(Array::from_elem(bsz, step as f32))?;
            let total_step_value = Value::from_array(total_step_array.clone())?;

            let est_outputs = self.vector_estimator.run(ort::inputs! {
                "noisy_latent" => &xt_value,
                "text_emb" => &text_emb_value,
                "style_ttl" => &style_ttl_value,
                "latent_mask" => &latent_mask_value,
                "text_mask" => &text_mask_value,
                "current_step" => &current_step_value,
                "total_step" => &total_step_value
            })?;
            let (denoised_shape, denoised_data) =
                est_outputs["denoised_latent"].try_extract_tensor::<f32>()?;
            xt = Array3::from_shape_vec(
                (
                    denoised_shape[0] as usize,
                    denoised_shape[1] as usize,
                    denoised_shape[2] as usize,
                ),
                denoised_data.to_vec(),
            )?;
        }

        // Vocode the final latent into a waveform batch.
        let latent_value = Value::from_array(xt)?;
        let voc_outputs = self.vocoder.run(ort::inputs! {
            "latent" => &latent_value
        })?;
        let (wav_shape, wav_data) = voc_outputs["wav_tts"].try_extract_tensor::<f32>()?;
        let wav = Array2::from_shape_vec(
            (wav_shape[0] as usize, wav_shape[1] as usize),
            wav_data.to_vec(),
        )?;

        Ok(Synthesis { wav, durations })
    }
}

impl Synthesizer for TextToSpeech {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn synthesize(
        &mut self,
        text: &str,
        _lang: &str,
        style: &VoiceStyle,
        opts: &SynthesisOptions,
    ) -> Result<Synthesis, TtsError> {
        opts.validate()?;
        if style.batch_size() != 1 {
            return Err(TtsError::InvalidInput(
                "single-utterance synthesis requires exactly one voice style".into(),
            ));
        }

        let chunks = chunk_text(text, MAX_CHUNK_CHARS);
        if chunks.is_empty() {
            return Err(TtsError::InvalidInput("text is empty".into()));
        }
        debug!("synthesizing 1 utterance in {} chunk(s)", chunks.len());

        let silence_len = (opts.silence_duration * self.sample_rate as f32) as usize;
        let mut samples: Vec<f32> = Vec::new();
        let mut total_duration = 0.0f32;

        for (idx, chunk) in chunks.iter().enumerate() {
            let result = self.infer(std::slice::from_ref(chunk), style, opts)?;
            if idx > 0 {
                samples.extend(std::iter::repeat(0.0).take(silence_len));
                total_duration += opts.silence_duration;
            }
            samples.extend(result.wav.row(0).iter().copied());
            total_duration += result.durations[0];
        }

        let len = samples.len();
        Ok(Synthesis {
            wav: Array2::from_shape_vec((1, len), samples)?,
            durations: vec![total_duration],
        })
    }

    fn synthesize_batch(
        &mut self,
        texts: &[String],
        langs: &[String],
        style: &VoiceStyle,
        opts: &SynthesisOptions,
    ) -> Result<Synthesis, TtsError> {
        opts.validate()?;
        if texts.len() != langs.len() {
            return Err(TtsError::InvalidInput(format!(
                "text count ({}) must match lang count ({})",
                texts.len(),
                langs.len()
            )));
        }
        self.infer(texts, style, opts)
    }
}

fn load_session(path: PathBuf) -> Result<Session, TtsError> {
    if !path.exists() {
        return Err(TtsError::ModelNotFound(path.display().to_string()));
    }
    Ok(Session::builder()?
        .with_optimization_level(GraphOptimizationLevel::Level3)?
        .commit_from_file(&path)?)
}
