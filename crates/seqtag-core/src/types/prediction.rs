use serde::{Deserialize, Serialize};

use crate::error::{NerError, Result};

/// Scores returned by the serving endpoint for one batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Per-position tag scores, shape `[batch, max_len, ntags]`.
    pub logits: Vec<Vec<Vec<f32>>>,
    /// Tag transition scores, shape `[ntags, ntags]`.
    pub trans_params: Vec<Vec<f32>>,
}

impl Prediction {
    /// Check the response against the batch it answers.
    ///
    /// Every sentence must have a score row per true position, each holding
    /// `ntags` scores; padded positions beyond the true length are ignored.
    pub fn validate(&self, sequence_lengths: &[usize], ntags: usize) -> Result<()> {
        if self.logits.len() != sequence_lengths.len() {
            return Err(NerError::MalformedResponse(format!(
                "expected logits for {} sentences, got {}",
                sequence_lengths.len(),
                self.logits.len()
            )));
        }

        if self.trans_params.len() != ntags || self.trans_params.iter().any(|r| r.len() != ntags) {
            return Err(NerError::MalformedResponse(format!(
                "trans_params must be {ntags}x{ntags}"
            )));
        }

        for (i, (scores, &len)) in self.logits.iter().zip(sequence_lengths).enumerate() {
            if scores.len() < len {
                return Err(NerError::MalformedResponse(format!(
                    "sentence {i} has {len} tokens but only {} score rows",
                    scores.len()
                )));
            }
            if let Some(row) = scores[..len].iter().find(|row| row.len() != ntags) {
                return Err(NerError::MalformedResponse(format!(
                    "sentence {i} has a score row of width {}, expected {ntags}",
                    row.len()
                )));
            }
        }

        Ok(())
    }
}
