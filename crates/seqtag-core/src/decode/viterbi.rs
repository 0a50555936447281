//! # Viterbi Decoding for CRF
//!
//! Finds the label sequence maximizing the sum of per-position emission
//! scores and pairwise transition scores over a `[seq_len, num_tags]` trellis.

use crate::error::{NerError, Result};

/// Viterbi decoder for CRF tag sequences.
#[derive(Debug, Clone)]
pub struct ViterbiDecoder {
    num_tags: usize,
}

/// Path score and backpointer for Viterbi decoding.
#[derive(Debug, Clone, Copy)]
struct PathState {
    score: f32,
    prev_tag: Option<usize>,
}

impl ViterbiDecoder {
    /// Create a new Viterbi decoder.
    ///
    /// # Arguments
    /// * `num_tags` - Number of distinct tags
    pub fn new(num_tags: usize) -> Self {
        Self { num_tags }
    }

    pub fn num_tags(&self) -> usize {
        self.num_tags
    }

    /// Decode the optimal tag sequence.
    ///
    /// # Arguments
    /// * `emission_scores` - Matrix of shape [seq_len, num_tags] with emission scores
    /// * `transition_matrix` - Matrix of shape [num_tags, num_tags]; entry
    ///   `[prev][curr]` scores moving from `prev` to `curr`
    ///
    /// # Returns
    /// The optimal tag sequence as indices and its total score. Ties go to
    /// the lowest tag index.
    pub fn decode(
        &self,
        emission_scores: &[Vec<f32>],
        transition_matrix: &[Vec<f32>],
    ) -> Result<(Vec<usize>, f32)> {
        self.run(emission_scores, transition_matrix, None)
    }

    /// Decode with hard constraints: transitions where `mask[prev][curr]` is
    /// false are never taken.
    pub fn decode_constrained(
        &self,
        emission_scores: &[Vec<f32>],
        transition_matrix: &[Vec<f32>],
        mask: &[Vec<bool>],
    ) -> Result<(Vec<usize>, f32)> {
        self.check_square("transition mask", mask)?;
        self.run(emission_scores, transition_matrix, Some(mask))
    }

    fn run(
        &self,
        emission_scores: &[Vec<f32>],
        transition_matrix: &[Vec<f32>],
        mask: Option<&[Vec<bool>]>,
    ) -> Result<(Vec<usize>, f32)> {
        self.check_square("transition matrix", transition_matrix)?;

        let seq_len = emission_scores.len();
        if seq_len == 0 {
            return Ok((Vec::new(), 0.0));
        }

        for (pos, row) in emission_scores.iter().enumerate() {
            if row.len() != self.num_tags {
                return Err(NerError::DimensionMismatch(format!(
                    "emission scores at position {}: expected {} tags, got {}",
                    pos,
                    self.num_tags,
                    row.len()
                )));
            }
        }

        let allowed = |prev: usize, curr: usize| mask.is_none_or(|m| m[prev][curr]);

        // DP table: [seq_len][num_tags]
        let mut dp: Vec<Vec<PathState>> = vec![
            vec![
                PathState {
                    score: f32::NEG_INFINITY,
                    prev_tag: None
                };
                self.num_tags
            ];
            seq_len
        ];

        for tag in 0..self.num_tags {
            dp[0][tag].score = emission_scores[0][tag];
        }

        // Forward pass
        for pos in 1..seq_len {
            for curr_tag in 0..self.num_tags {
                let mut best_score = f32::NEG_INFINITY;
                let mut best_prev = None;

                for prev_tag in 0..self.num_tags {
                    if !allowed(prev_tag, curr_tag) {
                        continue;
                    }

                    let score = dp[pos - 1][prev_tag].score
                        + transition_matrix[prev_tag][curr_tag]
                        + emission_scores[pos][curr_tag];

                    if best_prev.is_none() || score > best_score {
                        best_score = score;
                        best_prev = Some(prev_tag);
                    }
                }

                dp[pos][curr_tag] = PathState {
                    score: best_score,
                    prev_tag: best_prev,
                };
            }
        }

        // Best final tag
        let last = &dp[seq_len - 1];
        let mut best_final_tag = 0;
        for tag in 1..self.num_tags {
            if last[tag].score > last[best_final_tag].score {
                best_final_tag = tag;
            }
        }
        let best_score = last[best_final_tag].score;

        // Backtrack
        let mut path = Vec::with_capacity(seq_len);
        path.push(best_final_tag);
        let mut curr_tag = best_final_tag;

        for pos in (1..seq_len).rev() {
            curr_tag = dp[pos][curr_tag].prev_tag.ok_or_else(|| {
                NerError::DimensionMismatch(format!(
                    "no permitted transition into tag {} at position {}",
                    curr_tag, pos
                ))
            })?;
            path.push(curr_tag);
        }

        path.reverse();
        Ok((path, best_score))
    }

    fn check_square<T>(&self, what: &str, matrix: &[Vec<T>]) -> Result<()> {
        if matrix.len() != self.num_tags || matrix.iter().any(|row| row.len() != self.num_tags) {
            return Err(NerError::DimensionMismatch(format!(
                "{} must be {}x{}",
                what, self.num_tags, self.num_tags
            )));
        }
        Ok(())
    }
}
