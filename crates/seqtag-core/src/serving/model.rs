//! # Serving Model
//!
//! Batches encoded sentences, scores them remotely and decodes each
//! sentence's label path with Viterbi over the returned transition matrix.

use tracing::debug;

use crate::config::NerConfig;
use crate::decode::crf::CrfDecoder;
use crate::error::{NerError, Result};
use crate::serving::client::{HttpScorer, Scorer};
use crate::serving::feed::FeedDict;
use crate::types::{Metrics, MetricsAccumulator, Sentence, Token};

/// A sequence tagger whose scores come from a `Scorer`.
pub struct ServingModel<S = HttpScorer> {
    config: NerConfig,
    scorer: S,
    decoder: CrfDecoder,
}

impl ServingModel<HttpScorer> {
    /// Create a model scored by the HTTP endpoint at `api_url`.
    pub fn new(config: NerConfig, api_url: impl Into<String>) -> Result<Self> {
        let scorer = HttpScorer::with_url(api_url)?;
        Self::with_scorer(config, scorer)
    }
}

impl<S: Scorer> ServingModel<S> {
    /// Create a model scored by any `Scorer`.
    pub fn with_scorer(config: NerConfig, scorer: S) -> Result<Self> {
        config.validate()?;
        let decoder = CrfDecoder::from_config(&config);

        Ok(Self {
            config,
            scorer,
            decoder,
        })
    }

    pub fn config(&self) -> &NerConfig {
        &self.config
    }

    pub fn scorer(&self) -> &S {
        &self.scorer
    }

    /// Predict label ids for a batch of sentences.
    ///
    /// # Returns
    /// One label sequence per sentence, in input order, each as long as its
    /// sentence, together with the true sentence lengths.
    ///
    /// # Errors
    ///
    /// `NerError::UnsupportedDecodingMode` unless the configuration decodes
    /// with Viterbi, checked before anything else. Scorer failures and
    /// malformed responses are propagated.
    pub fn predict_batch(&self, sentences: &[Sentence]) -> Result<(Vec<Vec<usize>>, Vec<usize>)> {
        self.config.ensure_viterbi()?;

        if sentences.is_empty() {
            return Ok((Vec::new(), Vec::new()));
        }

        let feed = FeedDict::for_inference(sentences, self.config.use_chars);
        let prediction = self.scorer.score(&feed)?;
        let sequence_lengths = feed.sequence_lengths;
        let labels = self.decoder.decode_batch(&prediction, &sequence_lengths)?;

        debug!(
            batch = sentences.len(),
            tokens = sequence_lengths.iter().sum::<usize>(),
            "decoded batch"
        );

        Ok((labels, sequence_lengths))
    }

    /// Predict tag names for a single sentence.
    pub fn predict(&self, sentence: &[Token]) -> Result<Vec<String>> {
        let (mut labels, _) = self.predict_batch(&[sentence.to_vec()])?;
        let labels = labels.pop().unwrap_or_default();
        self.config.tags.names(&labels)
    }

    /// Evaluate against gold labels.
    ///
    /// Sentences are sent in minibatches of `config.batch_size`.
    ///
    /// # Errors
    ///
    /// `NerError::DimensionMismatch` if any gold label sequence differs in
    /// length from its sentence, checked before any request is made.
    pub fn evaluate(&self, examples: &[(Sentence, Vec<usize>)]) -> Result<Metrics> {
        for (i, (sentence, gold)) in examples.iter().enumerate() {
            if sentence.len() != gold.len() {
                return Err(NerError::DimensionMismatch(format!(
                    "example {i} has {} tokens but {} gold labels",
                    sentence.len(),
                    gold.len()
                )));
            }
        }

        let mut acc = MetricsAccumulator::new();

        for batch in examples.chunks(self.config.batch_size) {
            let sentences: Vec<Sentence> = batch.iter().map(|(s, _)| s.clone()).collect();
            let (predicted, _) = self.predict_batch(&sentences)?;

            for ((_, gold), pred) in batch.iter().zip(&predicted) {
                let gold_chunks = self.config.tags.chunks(gold)?;
                let pred_chunks = self.config.tags.chunks(pred)?;
                acc.add(gold, pred, &gold_chunks, &pred_chunks);
            }
        }

        let metrics = acc.finish();
        debug!(%metrics, sentences = examples.len(), "evaluation finished");
        Ok(metrics)
    }
}
