//! Request schema, validation and handlers for the synthesis service.
//!
//! Endpoints:
//! - `GET /health` - liveness probe, returns `{"status": "ok"}`
//! - `POST /tts` - synthesize speech; one result streams as a WAV
//!   attachment, several stream as a deflated ZIP of WAV files
//!
//! Errors are returned as `{"detail": "..."}` with a 400 for anything the
//! caller got wrong and a 500 for engine failures.

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use log::{debug, error};
use serde::Deserialize;
use serde_json::json;
use std::io::{Cursor, Write};
use std::sync::{Arc, Mutex};
use supertonic_core::{
    audio, text::sanitize_filename, Synthesis, SynthesisOptions, Synthesizer, TtsError,
    VoiceStyle, AVAILABLE_LANGS,
};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Shared service state.
///
/// The engine sits behind a mutex because ONNX sessions run with `&mut self`;
/// requests serialize on inference, which is what a single CPU-bound engine
/// wants anyway.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Mutex<Box<dyn Synthesizer>>>,
    pub sample_rate: u32,
}

/// A field that accepts either a single string or a list of strings.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    fn into_vec(self) -> Vec<String> {
        match self {
            OneOrMany::One(value) => vec![value],
            OneOrMany::Many(values) => values,
        }
    }
}

fn default_lang() -> OneOrMany {
    OneOrMany::One("en".to_string())
}

fn default_voice_style() -> OneOrMany {
    OneOrMany::One("assets/voice_styles/M1.json".to_string())
}

fn default_total_step() -> usize {
    5
}

fn default_speed() -> f32 {
    1.05
}

fn default_silence_duration() -> f32 {
    0.3
}

/// `POST /tts` request body.
#[derive(Debug, Deserialize)]
pub struct TtsRequest {
    pub text: OneOrMany,
    #[serde(default = "default_lang")]
    pub lang: OneOrMany,
    #[serde(default = "default_voice_style")]
    pub voice_style: OneOrMany,
    #[serde(default = "default_total_step")]
    pub total_step: usize,
    #[serde(default = "default_speed")]
    pub speed: f32,
    #[serde(default)]
    pub batch: bool,
    #[serde(default = "default_silence_duration")]
    pub silence_duration: f32,
}

/// Handler error, rendered as `{"detail": "..."}`.
pub enum ApiError {
    BadRequest(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            ApiError::BadRequest(detail) => (StatusCode::BAD_REQUEST, detail),
            ApiError::Internal(detail) => {
                error!("request failed: {detail}");
                (StatusCode::INTERNAL_SERVER_ERROR, detail)
            }
        };
        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

impl From<TtsError> for ApiError {
    fn from(err: TtsError) -> Self {
        match err {
            TtsError::InvalidInput(msg) => ApiError::BadRequest(msg),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

/// Build the service router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/tts", post(tts))
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn tts(
    State(state): State<AppState>,
    Json(req): Json<TtsRequest>,
) -> Result<Response, ApiError> {
    if req.total_step < 1 || req.total_step > 50 {
        return Err(ApiError::BadRequest(
            "total_step must be between 1 and 50".to_string(),
        ));
    }
    if req.speed <= 0.0 {
        return Err(ApiError::BadRequest("speed must be positive".to_string()));
    }
    if req.silence_duration < 0.0 {
        return Err(ApiError::BadRequest(
            "silence_duration must not be negative".to_string(),
        ));
    }

    let texts = req.text.into_vec();
    let langs = req.lang.into_vec();
    let styles = req.voice_style.into_vec();

    if req.batch {
        if texts.len() != langs.len() || texts.len() != styles.len() {
            return Err(ApiError::BadRequest(
                "text, lang, and voice_style must have the same length.".to_string(),
            ));
        }
    } else if texts.len() != 1 || langs.len() != 1 || styles.len() != 1 {
        return Err(ApiError::BadRequest(
            "Non-batch mode requires single text, lang, and voice_style.".to_string(),
        ));
    }

    validate_langs(&langs)?;

    let opts = SynthesisOptions {
        total_step: req.total_step,
        speed: req.speed,
        silence_duration: req.silence_duration,
    };

    debug!(
        "synthesizing {} item(s), batch={}, total_step={}",
        texts.len(),
        req.batch,
        req.total_step
    );

    let engine = state.engine.clone();
    let batch = req.batch;
    let job_texts = texts.clone();
    let result: Synthesis = tokio::task::spawn_blocking(move || -> Result<Synthesis, ApiError> {
        let style = VoiceStyle::load(&styles)?;
        let mut engine = engine
            .lock()
            .map_err(|_| ApiError::Internal("engine lock poisoned".to_string()))?;
        let synthesis = if batch {
            engine.synthesize_batch(&job_texts, &langs, &style, &opts)
        } else {
            engine.synthesize(&job_texts[0], &langs[0], &style, &opts)
        }?;
        Ok(synthesis)
    })
    .await
    .map_err(|err| ApiError::Internal(format!("synthesis task failed: {err}")))??;

    let chunks = audio::trim_to_durations(&result.wav, &result.durations, state.sample_rate);

    if chunks.len() == 1 {
        let bytes = audio::wav_bytes(&chunks[0], state.sample_rate)
            .map_err(|err| ApiError::Internal(err.to_string()))?;
        let filename = non_empty_or(sanitize_filename(&texts[0], 40), "tts".to_string());
        return Ok(wav_attachment(bytes, &filename));
    }

    let archive = build_zip(&chunks, &texts, state.sample_rate)?;
    Ok(zip_attachment(archive))
}

fn validate_langs(langs: &[String]) -> Result<(), ApiError> {
    let mut invalid: Vec<&str> = langs
        .iter()
        .map(String::as_str)
        .filter(|lang| !AVAILABLE_LANGS.contains(lang))
        .collect();
    invalid.sort_unstable();
    invalid.dedup();
    if invalid.is_empty() {
        Ok(())
    } else {
        Err(ApiError::BadRequest(format!(
            "Invalid language(s): {}",
            invalid.join(", ")
        )))
    }
}

fn non_empty_or(name: String, fallback: String) -> String {
    if name.is_empty() {
        fallback
    } else {
        name
    }
}

fn build_zip(
    chunks: &[Vec<f32>],
    texts: &[String],
    sample_rate: u32,
) -> Result<Vec<u8>, ApiError> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for (idx, chunk) in chunks.iter().enumerate() {
        let name = non_empty_or(sanitize_filename(&texts[idx], 40), format!("tts_{}", idx + 1));
        let bytes = audio::wav_bytes(chunk, sample_rate)
            .map_err(|err| ApiError::Internal(err.to_string()))?;
        zip.start_file(format!("{name}.wav"), options)
            .map_err(|err| ApiError::Internal(err.to_string()))?;
        zip.write_all(&bytes)
            .map_err(|err| ApiError::Internal(err.to_string()))?;
    }

    let cursor = zip
        .finish()
        .map_err(|err| ApiError::Internal(err.to_string()))?;
    Ok(cursor.into_inner())
}

fn wav_attachment(bytes: Vec<u8>, filename: &str) -> Response {
    (
        [
            (header::CONTENT_TYPE, "audio/wav".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}.wav\""),
            ),
        ],
        bytes,
    )
        .into_response()
}

fn zip_attachment(bytes: Vec<u8>) -> Response {
    (
        [
            (header::CONTENT_TYPE, "application/zip".to_string()),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"tts_outputs.zip\"".to_string(),
            ),
        ],
        bytes,
    )
        .into_response()
}
