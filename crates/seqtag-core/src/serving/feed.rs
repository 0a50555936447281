//! # Feed Dictionary
//!
//! Pads a batch of encoded sentences to uniform shape and names the tensors
//! the served model expects as inputs.

use serde::{Deserialize, Serialize};

use crate::types::Sentence;

/// Id used to pad words and characters.
pub const PAD_ID: u32 = 0;

/// Dropout keep-probability at inference time (nothing dropped).
pub const INFERENCE_DROPOUT: f32 = 1.0;

/// Named model inputs for one batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedDict {
    /// Word ids, shape `[batch, max_len]`.
    pub word_ids: Vec<Vec<u32>>,
    /// True (unpadded) sentence lengths, shape `[batch]`.
    pub sequence_lengths: Vec<usize>,
    /// Char ids, shape `[batch, max_len, max_word_len]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub char_ids: Option<Vec<Vec<Vec<u32>>>>,
    /// True word lengths in characters, shape `[batch, max_len]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub word_lengths: Option<Vec<Vec<usize>>>,
    pub dropout: f32,
}

impl FeedDict {
    /// Build the feed for a batch.
    ///
    /// # Arguments
    /// * `sentences` - Encoded sentences
    /// * `use_chars` - Whether to include padded char ids and word lengths
    /// * `dropout` - Dropout keep-probability fed to the model
    pub fn build(sentences: &[Sentence], use_chars: bool, dropout: f32) -> Self {
        let words: Vec<Vec<u32>> = sentences
            .iter()
            .map(|s| s.iter().map(|t| t.word_id).collect())
            .collect();
        let (word_ids, sequence_lengths) = pad_sequences(&words, PAD_ID);

        let (char_ids, word_lengths) = if use_chars {
            let chars: Vec<Vec<Vec<u32>>> = sentences
                .iter()
                .map(|s| s.iter().map(|t| t.char_ids.clone()).collect())
                .collect();
            let (char_ids, word_lengths) = pad_char_sequences(&chars, PAD_ID);
            (Some(char_ids), Some(word_lengths))
        } else {
            (None, None)
        };

        Self {
            word_ids,
            sequence_lengths,
            char_ids,
            word_lengths,
            dropout,
        }
    }

    /// Build the feed for inference (dropout disabled).
    pub fn for_inference(sentences: &[Sentence], use_chars: bool) -> Self {
        Self::build(sentences, use_chars, INFERENCE_DROPOUT)
    }

    pub fn batch_size(&self) -> usize {
        self.sequence_lengths.len()
    }

    /// Padded sentence length.
    pub fn max_len(&self) -> usize {
        self.word_ids.first().map_or(0, Vec::len)
    }
}

/// Pad sequences to the length of the longest one.
///
/// # Returns
/// The padded sequences and the original length of each.
pub fn pad_sequences<T: Clone>(sequences: &[Vec<T>], pad: T) -> (Vec<Vec<T>>, Vec<usize>) {
    let max_len = sequences.iter().map(Vec::len).max().unwrap_or(0);
    pad_to(sequences, pad, max_len)
}

/// Pad nested sequences (sentences of words of characters).
///
/// Every word is padded to the longest word in the batch, then every
/// sentence to the longest sentence using all-pad words.
///
/// # Returns
/// The padded ids and, per sentence, the original length of each word
/// (`0` for padding words).
pub fn pad_char_sequences<T: Clone>(
    sequences: &[Vec<Vec<T>>],
    pad: T,
) -> (Vec<Vec<Vec<T>>>, Vec<Vec<usize>>) {
    let max_word_len = sequences
        .iter()
        .flat_map(|s| s.iter().map(Vec::len))
        .max()
        .unwrap_or(0);
    let max_sentence_len = sequences.iter().map(Vec::len).max().unwrap_or(0);

    let mut padded = Vec::with_capacity(sequences.len());
    let mut lengths = Vec::with_capacity(sequences.len());

    for sentence in sequences {
        let (mut words, mut word_lengths) = pad_to(sentence, pad.clone(), max_word_len);
        words.resize(max_sentence_len, vec![pad.clone(); max_word_len]);
        word_lengths.resize(max_sentence_len, 0);

        padded.push(words);
        lengths.push(word_lengths);
    }

    (padded, lengths)
}

fn pad_to<T: Clone>(sequences: &[Vec<T>], pad: T, len: usize) -> (Vec<Vec<T>>, Vec<usize>) {
    sequences
        .iter()
        .map(|seq| {
            let mut padded = seq.clone();
            padded.resize(len.max(seq.len()), pad.clone());
            (padded, seq.len())
        })
        .unzip()
}
