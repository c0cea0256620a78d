//! Supertonic TTS service entry point.
//!
//! Loads the engine once at startup, then serves the API from `api.rs`.
//!
//! Configuration:
//! - `--port` / `-p` - listen port (default 8080)
//! - `--onnx-dir` or `TTS_ONNX_DIR` - exported model directory
//! - `--use-gpu` or `TTS_USE_GPU` - request GPU execution

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::{Arc, Mutex};
use supertonic_core::{Synthesizer, TextToSpeech};
use supertonic_server::api::{self, AppState};

/// Supertonic TTS HTTP service
#[derive(Parser, Debug)]
#[command(name = "supertonic-server")]
#[command(about = "Supertonic TTS - HTTP synthesis service", long_about = None)]
struct Args {
    /// Listen port
    #[arg(short, long, default_value = "8080")]
    port: u16,

    /// Path to the ONNX model directory
    #[arg(long, env = "TTS_ONNX_DIR", default_value = "assets/onnx")]
    onnx_dir: String,

    /// Use GPU for inference (default: CPU)
    #[arg(long, default_value = "false")]
    use_gpu: bool,
}

fn env_flag(name: &str) -> bool {
    match std::env::var(name) {
        Ok(value) => matches!(
            value.trim().to_lowercase().as_str(),
            "1" | "true" | "yes" | "y" | "on"
        ),
        Err(_) => false,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse();
    let use_gpu = args.use_gpu || env_flag("TTS_USE_GPU");

    println!("🚀 Starting Supertonic TTS service");
    println!("   Model directory: {}", args.onnx_dir);

    let engine = TextToSpeech::load(&args.onnx_dir, use_gpu)
        .with_context(|| format!("failed to load engine from {}", args.onnx_dir))?;
    let sample_rate = engine.sample_rate();
    println!("   Engine ready ({sample_rate} Hz)");

    let state = AppState {
        engine: Arc::new(Mutex::new(Box::new(engine))),
        sample_rate,
    };

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    println!("📡 Listening on http://{addr}");
    println!("   POST /tts    - synthesize speech");
    println!("   GET  /health - health check");

    axum::serve(listener, api::router(state))
        .await
        .context("server error")?;
    Ok(())
}
