//! Gaussian latent sampling for the denoising loop.

use ndarray::Array3;
use rand::Rng;
use rand_distr::StandardNormal;

/// Build a `[bsz, 1, max_len]` f32 mask from per-item lengths.
pub fn length_to_mask(lengths: &[usize], max_len: Option<usize>) -> Array3<f32> {
    let max_len = max_len.unwrap_or_else(|| lengths.iter().copied().max().unwrap_or(0));
    let mut mask = Array3::<f32>::zeros((lengths.len(), 1, max_len));
    for (i, &len) in lengths.iter().enumerate() {
        for j in 0..len.min(max_len) {
            mask[[i, 0, j]] = 1.0;
        }
    }
    mask
}

/// Sample the initial noisy latent for a batch of target durations.
///
/// Latent geometry follows the exported model: one latent frame covers
/// `chunk_size` output samples and carries `latent_dim` channels (both
/// already chunk-compressed, see `EngineConfig`). Frames past an item's
/// own length are zeroed by the returned mask.
///
/// Returns `(noisy_latent [bsz, latent_dim, latent_len], latent_mask [bsz, 1, latent_len])`.
pub fn sample_noisy_latent(
    durations: &[f32],
    sample_rate: u32,
    chunk_size: usize,
    latent_dim: usize,
) -> (Array3<f32>, Array3<f32>) {
    let bsz = durations.len();
    let wav_lengths: Vec<usize> = durations
        .iter()
        .map(|&d| (d * sample_rate as f32) as usize)
        .collect();
    let wav_len_max = wav_lengths.iter().copied().max().unwrap_or(0);
    let latent_len = wav_len_max.div_ceil(chunk_size);

    let latent_lengths: Vec<usize> = wav_lengths
        .iter()
        .map(|&len| len.div_ceil(chunk_size))
        .collect();
    let latent_mask = length_to_mask(&latent_lengths, Some(latent_len));

    let mut rng = rand::thread_rng();
    let mut noisy_latent = Array3::<f32>::zeros((bsz, latent_dim, latent_len));
    for b in 0..bsz {
        for d in 0..latent_dim {
            for t in 0..latent_len {
                let sample: f32 = rng.sample(StandardNormal);
                noisy_latent[[b, d, t]] = sample * latent_mask[[b, 0, t]];
            }
        }
    }

    (noisy_latent, latent_mask)
}
