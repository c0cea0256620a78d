//! Router tests against a stub engine.
//!
//! The stub produces silence-like audio with fixed one-second durations so
//! the handlers, validation and attachment plumbing can be exercised without
//! model files on disk.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use ndarray::Array2;
use serde_json::{json, Value};
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use supertonic_core::{Synthesis, SynthesisOptions, Synthesizer, TtsError, VoiceStyle};
use supertonic_server::api::{self, AppState};
use tower::ServiceExt;

const SAMPLE_RATE: u32 = 100;

struct StubEngine;

impl Synthesizer for StubEngine {
    fn sample_rate(&self) -> u32 {
        SAMPLE_RATE
    }

    fn synthesize(
        &mut self,
        _text: &str,
        _lang: &str,
        _style: &VoiceStyle,
        _opts: &SynthesisOptions,
    ) -> Result<Synthesis, TtsError> {
        Ok(Synthesis {
            wav: Array2::from_elem((1, 2 * SAMPLE_RATE as usize), 0.1),
            durations: vec![1.0],
        })
    }

    fn synthesize_batch(
        &mut self,
        texts: &[String],
        _langs: &[String],
        _style: &VoiceStyle,
        _opts: &SynthesisOptions,
    ) -> Result<Synthesis, TtsError> {
        Ok(Synthesis {
            wav: Array2::from_elem((texts.len(), 2 * SAMPLE_RATE as usize), 0.1),
            durations: vec![1.0; texts.len()],
        })
    }
}

fn test_state() -> AppState {
    AppState {
        engine: Arc::new(Mutex::new(Box::new(StubEngine))),
        sample_rate: SAMPLE_RATE,
    }
}

fn write_temp_style(tag: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!(
        "supertonic_api_test_{}_{tag}.json",
        std::process::id()
    ));
    let style = r#"{
        "style_ttl": {"data": [[[0.0, 0.0]]], "dims": [1, 1, 2], "type": "float32"},
        "style_dp": {"data": [[[0.0]]], "dims": [1, 1, 1], "type": "float32"}
    }"#;
    std::fs::write(&path, style).expect("failed to write temp style");
    path
}

async fn post_tts(body: Value) -> axum::response::Response {
    let app = api::router(test_state());
    app.oneshot(
        Request::builder()
            .method("POST")
            .uri("/tts")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .expect("failed to build request"),
    )
    .await
    .expect("request failed")
}

async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .expect("failed to read body")
        .to_bytes()
        .to_vec()
}

async fn detail_of(response: axum::response::Response) -> String {
    let bytes = body_bytes(response).await;
    let value: Value = serde_json::from_slice(&bytes).expect("body is not JSON");
    value["detail"].as_str().expect("missing detail").to_string()
}

#[tokio::test]
async fn test_health() {
    let app = api::router(test_state());
    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .expect("failed to build request"),
        )
        .await
        .expect("request failed");

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = body_bytes(response).await;
    let value: Value = serde_json::from_slice(&bytes).expect("body is not JSON");
    assert_eq!(value, json!({"status": "ok"}));
}

#[tokio::test]
async fn test_single_text_returns_wav_attachment() {
    let style = write_temp_style("single");
    let response = post_tts(json!({
        "text": "Hello world!",
        "voice_style": style.to_str().expect("utf-8 path")
    }))
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["content-type"].to_str().unwrap(),
        "audio/wav"
    );
    assert_eq!(
        response.headers()["content-disposition"].to_str().unwrap(),
        "attachment; filename=\"Hello_world_.wav\""
    );

    let bytes = body_bytes(response).await;
    assert_eq!(&bytes[0..4], b"RIFF");
    let reader = hound::WavReader::new(Cursor::new(bytes)).expect("invalid WAV");
    assert_eq!(reader.spec().sample_rate, SAMPLE_RATE);
    // The stub reports a 1.0s duration, so the padded row is trimmed.
    assert_eq!(reader.len(), SAMPLE_RATE);
}

#[tokio::test]
async fn test_batch_returns_zip_with_one_entry_per_text() {
    let style_a = write_temp_style("batch_a");
    let style_b = write_temp_style("batch_b");
    let response = post_tts(json!({
        "text": ["One two.", "Three four."],
        "lang": ["en", "ko"],
        "voice_style": [style_a.to_str().unwrap(), style_b.to_str().unwrap()],
        "batch": true
    }))
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["content-type"].to_str().unwrap(),
        "application/zip"
    );
    assert_eq!(
        response.headers()["content-disposition"].to_str().unwrap(),
        "attachment; filename=\"tts_outputs.zip\""
    );

    let bytes = body_bytes(response).await;
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).expect("invalid ZIP");
    assert_eq!(archive.len(), 2);
    assert!(archive.by_name("One_two_.wav").is_ok());
    assert!(archive.by_name("Three_four_.wav").is_ok());
}

#[tokio::test]
async fn test_batch_length_mismatch_is_rejected() {
    let response = post_tts(json!({
        "text": ["a", "b"],
        "lang": "en",
        "batch": true
    }))
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        detail_of(response).await,
        "text, lang, and voice_style must have the same length."
    );
}

#[tokio::test]
async fn test_non_batch_rejects_multiple_texts() {
    let response = post_tts(json!({
        "text": ["a", "b"]
    }))
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        detail_of(response).await,
        "Non-batch mode requires single text, lang, and voice_style."
    );
}

#[tokio::test]
async fn test_invalid_langs_listed_sorted() {
    let response = post_tts(json!({
        "text": ["a", "b", "c"],
        "lang": ["zz", "en", "aa"],
        "voice_style": ["x", "y", "z"],
        "batch": true
    }))
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(detail_of(response).await, "Invalid language(s): aa, zz");
}

#[tokio::test]
async fn test_total_step_out_of_range() {
    let response = post_tts(json!({"text": "hi", "total_step": 0})).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = post_tts(json!({"text": "hi", "total_step": 51})).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_missing_style_file_is_internal_error() {
    let response = post_tts(json!({
        "text": "hi",
        "voice_style": "/nonexistent/style.json"
    }))
    .await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(detail_of(response).await.contains("voice style not found"));
}
