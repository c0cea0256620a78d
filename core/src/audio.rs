//! Waveform trimming and WAV encoding.
//!
//! The vocoder emits fixed-width batches padded to the longest item; every
//! consumer trims each row back to `sample_rate * duration` before writing.

use crate::error::TtsError;
use hound::{SampleFormat, WavSpec, WavWriter};
use ndarray::Array2;
use std::io::Cursor;
use std::path::Path;

fn wav_spec(sample_rate: u32) -> WavSpec {
    WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    }
}

/// Trim a `[bsz, T]` waveform batch to each item's reported duration.
pub fn trim_to_durations(wav: &Array2<f32>, durations: &[f32], sample_rate: u32) -> Vec<Vec<f32>> {
    let width = wav.shape()[1];
    wav.outer_iter()
        .zip(durations)
        .map(|(row, &dur)| {
            let end = ((sample_rate as f32 * dur) as usize).min(width);
            row.iter().take(end).copied().collect()
        })
        .collect()
}

/// Write float samples as 16-bit PCM mono WAV to a file.
pub fn write_wav(
    path: impl AsRef<Path>,
    samples: &[f32],
    sample_rate: u32,
) -> Result<(), TtsError> {
    let mut writer = WavWriter::create(path, wav_spec(sample_rate))?;
    write_samples(&mut writer, samples)?;
    writer.finalize()?;
    Ok(())
}

/// Encode float samples as 16-bit PCM mono WAV in memory.
pub fn wav_bytes(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>, TtsError> {
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = WavWriter::new(&mut cursor, wav_spec(sample_rate))?;
        write_samples(&mut writer, samples)?;
        writer.finalize()?;
    }
    Ok(cursor.into_inner())
}

fn write_samples<W>(writer: &mut WavWriter<W>, samples: &[f32]) -> Result<(), TtsError>
where
    W: std::io::Write + std::io::Seek,
{
    for &sample in samples {
        let clamped = sample.clamp(-1.0, 1.0);
        writer.write_sample((clamped * 32767.0) as i16)?;
    }
    Ok(())
}
