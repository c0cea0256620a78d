//! Voice style loading.
//!
//! A voice style is a JSON descriptor holding two reference tensors: one
//! conditioning the text-to-latent stack (`style_ttl`) and one conditioning
//! the duration predictor (`style_dp`). Loading N descriptors stacks them
//! along the batch axis so one style row lines up with one utterance.

use crate::error::TtsError;
use log::debug;
use ndarray::Array3;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// One tensor inside a voice style descriptor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StyleTensor {
    /// Nested `[1][d1][d2]` values.
    pub data: Vec<Vec<Vec<f32>>>,
    /// Tensor dims, `[1, d1, d2]`.
    pub dims: Vec<usize>,
    /// Element type tag (always `"float32"` in exported styles).
    #[serde(rename = "type")]
    pub dtype: String,
}

/// On-disk voice style descriptor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceStyleFile {
    pub style_ttl: StyleTensor,
    pub style_dp: StyleTensor,
}

/// A batch of voice styles stacked into engine-ready tensors.
#[derive(Debug, Clone)]
pub struct VoiceStyle {
    /// Text-to-latent conditioning, `[bsz, d1, d2]`.
    pub ttl: Array3<f32>,
    /// Duration predictor conditioning, `[bsz, d1, d2]`.
    pub dp: Array3<f32>,
}

impl VoiceStyle {
    /// Load one or more voice style files and stack them along the batch axis.
    ///
    /// All files must share the dimensions of the first one.
    pub fn load<P: AsRef<Path>>(paths: &[P]) -> Result<Self, TtsError> {
        if paths.is_empty() {
            return Err(TtsError::Style("no voice style paths given".into()));
        }

        let files: Vec<VoiceStyleFile> = paths
            .iter()
            .map(|p| read_style_file(p.as_ref()))
            .collect::<Result<_, _>>()?;

        let ttl = stack_tensors(&files, |f| &f.style_ttl, "style_ttl")?;
        let dp = stack_tensors(&files, |f| &f.style_dp, "style_dp")?;

        debug!("loaded {} voice style(s)", files.len());
        Ok(Self { ttl, dp })
    }

    /// Number of stacked styles.
    pub fn batch_size(&self) -> usize {
        self.ttl.shape()[0]
    }
}

fn read_style_file(path: &Path) -> Result<VoiceStyleFile, TtsError> {
    if !path.exists() {
        return Err(TtsError::Style(format!(
            "voice style not found: {}",
            path.display()
        )));
    }
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}

fn stack_tensors(
    files: &[VoiceStyleFile],
    select: impl Fn(&VoiceStyleFile) -> &StyleTensor,
    name: &str,
) -> Result<Array3<f32>, TtsError> {
    let first = select(&files[0]);
    if first.dims.len() != 3 {
        return Err(TtsError::Style(format!(
            "{name} must be rank 3, got dims {:?}",
            first.dims
        )));
    }
    let (d1, d2) = (first.dims[1], first.dims[2]);

    let mut flat = Vec::with_capacity(files.len() * d1 * d2);
    for file in files {
        let tensor = select(file);
        if tensor.dims[1] != d1 || tensor.dims[2] != d2 {
            return Err(TtsError::Style(format!(
                "{name} dims mismatch: expected [1, {d1}, {d2}], got {:?}",
                tensor.dims
            )));
        }
        for batch in &tensor.data {
            for row in batch {
                flat.extend_from_slice(row);
            }
        }
    }

    if flat.len() != files.len() * d1 * d2 {
        return Err(TtsError::Style(format!(
            "{name} data does not match dims [1, {d1}, {d2}]"
        )));
    }

    Ok(Array3::from_shape_vec((files.len(), d1, d2), flat)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn style_json(fill: f32) -> String {
        format!(
            r#"{{
                "style_ttl": {{"data": [[[{a}, {a}], [{a}, {a}]]], "dims": [1, 2, 2], "type": "float32"}},
                "style_dp": {{"data": [[[{a}]]], "dims": [1, 1, 1], "type": "float32"}}
            }}"#,
            a = fill
        )
    }

    fn parse(fill: f32) -> VoiceStyleFile {
        serde_json::from_str(&style_json(fill)).unwrap()
    }

    #[test]
    fn test_parse_style_file() {
        let file = parse(0.5);
        assert_eq!(file.style_ttl.dims, vec![1, 2, 2]);
        assert_eq!(file.style_dp.data[0][0][0], 0.5);
        assert_eq!(file.style_ttl.dtype, "float32");
    }

    #[test]
    fn test_stack_two_styles() {
        let files = vec![parse(1.0), parse(2.0)];
        let ttl = stack_tensors(&files, |f| &f.style_ttl, "style_ttl").unwrap();
        assert_eq!(ttl.shape(), &[2, 2, 2]);
        assert_eq!(ttl[[0, 0, 0]], 1.0);
        assert_eq!(ttl[[1, 1, 1]], 2.0);
    }

    #[test]
    fn test_dims_mismatch_rejected() {
        let mut odd = parse(1.0);
        odd.style_ttl.dims = vec![1, 3, 2];
        let files = vec![parse(1.0), odd];
        assert!(stack_tensors(&files, |f| &f.style_ttl, "style_ttl").is_err());
    }

    #[test]
    fn test_missing_path_is_style_error() {
        let err = VoiceStyle::load(&["/nonexistent/style.json"]).unwrap_err();
        assert!(matches!(err, TtsError::Style(_)));
    }
}
