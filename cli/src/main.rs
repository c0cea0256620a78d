//! Supertonic CLI - batch speech synthesis from the command line.
//!
//! Loads the exported ONNX model once, then runs `--n-test` synthesis passes
//! over the given text/voice-style pairs and writes trimmed WAV files to
//! `--save-dir`.

use anyhow::{bail, Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use supertonic_core::text::sanitize_filename;
use supertonic_core::{audio, SynthesisOptions, Synthesizer, TextToSpeech, VoiceStyle};

/// Supertonic batch synthesis
#[derive(Parser, Debug)]
#[command(name = "supertonic")]
#[command(about = "Supertonic TTS - batch ONNX inference", long_about = None)]
struct Args {
    /// Use GPU for inference (default: CPU)
    #[arg(long, default_value = "false")]
    use_gpu: bool,

    /// Path to the ONNX model directory
    #[arg(long, env = "TTS_ONNX_DIR", default_value = "assets/onnx")]
    onnx_dir: String,

    /// Number of denoising steps
    #[arg(long, default_value = "5")]
    total_step: usize,

    /// Number of synthesis passes to run
    #[arg(long, default_value = "4")]
    n_test: usize,

    /// Voice style file path(s)
    #[arg(long, value_delimiter = ',', default_values_t = vec!["assets/voice_styles/M1.json".to_string()])]
    voice_style: Vec<String>,

    /// Text(s) to synthesize
    #[arg(long, value_delimiter = '|', default_values_t = vec!["This morning, I took a walk in the park, and the sound of the birds and the breeze was so pleasant that I stopped for a long time just to listen.".to_string()])]
    text: Vec<String>,

    /// Output directory
    #[arg(long, default_value = "results")]
    save_dir: String,
}

fn timer<T>(name: &str, f: impl FnOnce() -> Result<T>) -> Result<T> {
    println!("{name}...");
    let start = Instant::now();
    let out = f()?;
    println!("-> completed in {:.2} sec", start.elapsed().as_secs_f64());
    Ok(out)
}

fn main() -> Result<()> {
    env_logger::init();

    println!("=== Supertonic TTS (ONNX Runtime) ===\n");

    let args = Args::parse();
    if args.voice_style.len() != args.text.len() {
        bail!(
            "Number of voice styles ({}) must match number of texts ({})",
            args.voice_style.len(),
            args.text.len()
        );
    }
    let bsz = args.text.len();

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner());
    spinner.set_message(format!("Loading engine from {}", args.onnx_dir));
    spinner.enable_steady_tick(Duration::from_millis(100));

    let mut engine = TextToSpeech::load(&args.onnx_dir, args.use_gpu)
        .with_context(|| format!("failed to load engine from {}", args.onnx_dir))?;
    let style = VoiceStyle::load(&args.voice_style).context("failed to load voice styles")?;
    spinner.finish_with_message(format!("Engine ready ({} Hz)", engine.sample_rate()));

    let langs = vec!["en".to_string(); bsz];
    let opts = SynthesisOptions {
        total_step: args.total_step,
        ..SynthesisOptions::default()
    };

    fs::create_dir_all(&args.save_dir)
        .with_context(|| format!("failed to create {}", args.save_dir))?;

    for n in 0..args.n_test {
        println!("\n[{}/{}] Starting synthesis...", n + 1, args.n_test);

        let result = timer("Generating speech from text", || {
            engine
                .synthesize_batch(&args.text, &langs, &style, &opts)
                .context("synthesis failed")
        })?;

        let trimmed = audio::trim_to_durations(&result.wav, &result.durations, engine.sample_rate());
        for (i, samples) in trimmed.iter().enumerate() {
            let fname = format!("{}_{}.wav", sanitize_filename(&args.text[i], 20), n + 1);
            let output_path = PathBuf::from(&args.save_dir).join(&fname);
            audio::write_wav(&output_path, samples, engine.sample_rate())
                .with_context(|| format!("failed to write {}", output_path.display()))?;
            println!("Saved: {}", output_path.display());
        }
    }

    println!("\n=== Synthesis completed successfully! ===");
    Ok(())
}
