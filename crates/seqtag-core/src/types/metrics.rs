use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::decode::tags::Chunk;

/// Token accuracy and chunk-level precision, recall and F1, all in `[0.0, 1.0]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub accuracy: f32,
    pub precision: f32,
    pub recall: f32,
    pub f1: f32,
}

/// Running counts behind `Metrics`.
#[derive(Debug, Clone, Default)]
pub struct MetricsAccumulator {
    correct_tokens: usize,
    total_tokens: usize,
    correct_chunks: usize,
    predicted_chunks: usize,
    gold_chunks: usize,
}

impl MetricsAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one sentence: gold and predicted labels with their chunks.
    pub fn add(
        &mut self,
        gold: &[usize],
        predicted: &[usize],
        gold_chunks: &[Chunk],
        predicted_chunks: &[Chunk],
    ) {
        self.correct_tokens += gold
            .iter()
            .zip(predicted)
            .filter(|(g, p)| g == p)
            .count();
        self.total_tokens += gold.len();

        let gold_set: HashSet<&Chunk> = gold_chunks.iter().collect();
        let predicted_set: HashSet<&Chunk> = predicted_chunks.iter().collect();
        self.correct_chunks += gold_set.intersection(&predicted_set).count();
        self.predicted_chunks += predicted_set.len();
        self.gold_chunks += gold_set.len();
    }

    pub fn finish(&self) -> Metrics {
        let ratio = |num: usize, den: usize| {
            if den > 0 {
                num as f32 / den as f32
            } else {
                0.0
            }
        };

        let precision = ratio(self.correct_chunks, self.predicted_chunks);
        let recall = ratio(self.correct_chunks, self.gold_chunks);
        let f1 = if self.correct_chunks > 0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };

        Metrics {
            accuracy: ratio(self.correct_tokens, self.total_tokens),
            precision,
            recall,
            f1,
        }
    }
}

impl fmt::Display for Metrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "acc {:.2} - p {:.2} - r {:.2} - f1 {:.2}",
            self.accuracy * 100.0,
            self.precision * 100.0,
            self.recall * 100.0,
            self.f1 * 100.0
        )
    }
}
