//! Text preprocessing for the synthesis front-end.
//!
//! The exported model consumes raw Unicode codepoints mapped through an
//! indexer table (`unicode_indexer.json`), so there is no phoneme dictionary:
//! preprocessing is NFKD normalization plus a table lookup, padded into a
//! `[bsz, max_len]` id batch with a matching `[bsz, 1, max_len]` mask.

use crate::error::TtsError;
use crate::latent::length_to_mask;
use ndarray::{Array2, Array3};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use unicode_normalization::UnicodeNormalization;

/// Character budget for one chunk of single-utterance synthesis.
pub const MAX_CHUNK_CHARS: usize = 300;

static PARAGRAPH_SPLIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n\s*\n+").expect("valid regex"));
static SENTENCE_SPLIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.!?]+\s+").expect("valid regex"));

/// Codepoint-to-id lookup loaded from `unicode_indexer.json`.
///
/// The table is a dense `Vec<i64>` indexed by codepoint; codepoints beyond
/// the table map to `-1`, which the model treats as unknown.
#[derive(Debug)]
pub struct TextProcessor {
    indexer: Vec<i64>,
}

impl TextProcessor {
    /// Load the indexer table from a JSON array file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, TtsError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(TtsError::Config(format!(
                "unicode indexer not found: {}",
                path.display()
            )));
        }
        let reader = BufReader::new(File::open(path)?);
        let indexer: Vec<i64> = serde_json::from_reader(reader)?;
        Ok(Self { indexer })
    }

    /// Encode a batch of texts into padded ids and a text mask.
    ///
    /// Returns `(text_ids [bsz, max_len], text_mask [bsz, 1, max_len])`.
    pub fn encode(&self, texts: &[String]) -> Result<(Array2<i64>, Array3<f32>), TtsError> {
        if texts.is_empty() {
            return Err(TtsError::InvalidInput("empty text batch".into()));
        }

        let processed: Vec<String> = texts.iter().map(|t| preprocess_text(t)).collect();
        let lengths: Vec<usize> = processed.iter().map(|t| t.chars().count()).collect();
        let max_len = lengths.iter().copied().max().unwrap_or(0);
        if max_len == 0 {
            return Err(TtsError::InvalidInput("all texts are empty".into()));
        }

        let mut ids = Array2::<i64>::zeros((processed.len(), max_len));
        for (row, text) in processed.iter().enumerate() {
            for (col, ch) in text.chars().enumerate() {
                let codepoint = ch as usize;
                ids[[row, col]] = self.indexer.get(codepoint).copied().unwrap_or(-1);
            }
        }

        let mask = length_to_mask(&lengths, Some(max_len));
        Ok((ids, mask))
    }
}

/// NFKD-normalize text before indexing.
pub fn preprocess_text(text: &str) -> String {
    text.nfkd().collect()
}

/// Split long text into synthesis chunks.
///
/// Paragraphs (blank-line separated) are split into sentences at `[.!?]`
/// boundaries, then sentences are greedily packed up to `max_chars`.
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();

    for paragraph in PARAGRAPH_SPLIT.split(text) {
        let paragraph = paragraph.trim();
        if paragraph.is_empty() {
            continue;
        }

        let mut sentences = Vec::new();
        let mut last = 0;
        for m in SENTENCE_SPLIT.find_iter(paragraph) {
            // Keep the terminal punctuation, drop the trailing whitespace.
            let sentence = paragraph[last..m.end()].trim();
            if !sentence.is_empty() {
                sentences.push(sentence.to_string());
            }
            last = m.end();
        }
        let tail = paragraph[last..].trim();
        if !tail.is_empty() {
            sentences.push(tail.to_string());
        }

        let mut current = String::new();
        for sentence in sentences {
            if !current.is_empty() && current.chars().count() + sentence.chars().count() + 1 > max_chars {
                chunks.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(&sentence);
        }
        if !current.is_empty() {
            chunks.push(current);
        }
    }

    if chunks.is_empty() {
        let trimmed = text.trim();
        if !trimmed.is_empty() {
            chunks.push(trimmed.to_string());
        }
    }

    chunks
}

/// Derive a filesystem-safe name from utterance text.
///
/// Takes up to `max_len` characters, keeping ASCII alphanumerics and
/// replacing everything else with `_`.
pub fn sanitize_filename(text: &str, max_len: usize) -> String {
    text.chars()
        .take(max_len)
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn processor_with_table(table: Vec<i64>) -> TextProcessor {
        TextProcessor { indexer: table }
    }

    #[test]
    fn test_preprocess_decomposes() {
        // U+00E9 (é) decomposes to 'e' + combining acute under NFKD.
        let out = preprocess_text("caf\u{00e9}");
        assert_eq!(out.chars().count(), 5);
        assert!(out.starts_with("cafe"));
    }

    #[test]
    fn test_encode_pads_and_masks() {
        // Identity table over the ASCII range.
        let table: Vec<i64> = (0..128).collect();
        let processor = processor_with_table(table);

        let texts = vec!["ab".to_string(), "abcd".to_string()];
        let (ids, mask) = processor.encode(&texts).unwrap();

        assert_eq!(ids.shape(), &[2, 4]);
        assert_eq!(ids[[0, 0]], 'a' as i64);
        assert_eq!(ids[[0, 2]], 0); // padding
        assert_eq!(ids[[1, 3]], 'd' as i64);

        assert_eq!(mask.shape(), &[2, 1, 4]);
        assert_eq!(mask[[0, 0, 1]], 1.0);
        assert_eq!(mask[[0, 0, 2]], 0.0);
        assert_eq!(mask[[1, 0, 3]], 1.0);
    }

    #[test]
    fn test_encode_out_of_table_is_unknown() {
        let processor = processor_with_table(vec![0; 8]);
        let (ids, _) = processor.encode(&["z".to_string()]).unwrap();
        assert_eq!(ids[[0, 0]], -1);
    }

    #[test]
    fn test_encode_rejects_empty_batch() {
        let processor = processor_with_table(vec![0; 8]);
        assert!(processor.encode(&[]).is_err());
    }

    #[test]
    fn test_chunk_short_text_is_single_chunk() {
        let chunks = chunk_text("Hello world.", MAX_CHUNK_CHARS);
        assert_eq!(chunks, vec!["Hello world.".to_string()]);
    }

    #[test]
    fn test_chunk_packs_sentences() {
        let chunks = chunk_text("One. Two. Three.", 10);
        assert_eq!(chunks, vec!["One. Two.", "Three."]);
    }

    #[test]
    fn test_chunk_splits_paragraphs() {
        let chunks = chunk_text("First paragraph.\n\nSecond paragraph.", MAX_CHUNK_CHARS);
        assert_eq!(chunks.len(), 2);
    }

    #[test]
    fn test_chunk_unpunctuated_text() {
        let chunks = chunk_text("no punctuation here", MAX_CHUNK_CHARS);
        assert_eq!(chunks, vec!["no punctuation here".to_string()]);
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("Hello, world!", 40), "Hello__world_");
        assert_eq!(sanitize_filename("abc", 2), "ab");
        assert_eq!(sanitize_filename("", 10), "");
    }
}
