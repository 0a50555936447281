//! Batch decoding of a CRF prediction response.

use crate::config::NerConfig;
use crate::decode::viterbi::ViterbiDecoder;
use crate::error::Result;
use crate::types::Prediction;

/// Decodes every sentence of a prediction with the shared transition matrix.
#[derive(Debug, Clone)]
pub struct CrfDecoder {
    viterbi: ViterbiDecoder,
    mask: Option<Vec<Vec<bool>>>,
}

impl CrfDecoder {
    /// Decoder for the tag set of `config`, constrained to BIO-valid
    /// transitions when `config.constrain_transitions` is set.
    pub fn from_config(config: &NerConfig) -> Self {
        Self {
            viterbi: ViterbiDecoder::new(config.ntags()),
            mask: config
                .constrain_transitions
                .then(|| config.tags.transition_mask()),
        }
    }

    pub fn num_tags(&self) -> usize {
        self.viterbi.num_tags()
    }

    /// Decode one label path per sentence.
    ///
    /// Each sentence's logits are truncated to its true length first, so
    /// padded positions never influence the path.
    pub fn decode_batch(
        &self,
        prediction: &Prediction,
        sequence_lengths: &[usize],
    ) -> Result<Vec<Vec<usize>>> {
        prediction.validate(sequence_lengths, self.num_tags())?;

        prediction
            .logits
            .iter()
            .zip(sequence_lengths)
            .map(|(logits, &len)| self.decode(&logits[..len], &prediction.trans_params))
            .collect()
    }

    /// Decode a single, already truncated score matrix.
    pub fn decode(&self, logits: &[Vec<f32>], trans_params: &[Vec<f32>]) -> Result<Vec<usize>> {
        let (path, _score) = match &self.mask {
            Some(mask) => self.viterbi.decode_constrained(logits, trans_params, mask)?,
            None => self.viterbi.decode(logits, trans_params)?,
        };
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::tags::TagSet;
    use crate::error::NerError;

    fn prediction() -> Prediction {
        Prediction {
            logits: vec![
                vec![vec![0.0, 2.0, 0.0], vec![2.0, 0.0, 0.0], vec![0.0, 0.0, 2.0]],
                // Second sentence has one real token; its padding favours tag 2.
                vec![vec![2.0, 0.0, 0.0], vec![0.0, 0.0, 9.0], vec![0.0, 0.0, 9.0]],
            ],
            trans_params: vec![vec![0.0; 3]; 3],
        }
    }

    fn config() -> NerConfig {
        NerConfig::new().with_tags(TagSet::new(["O", "B-PER", "I-PER"]).unwrap())
    }

    #[test]
    fn test_decode_batch_truncates_padding() {
        let decoder = CrfDecoder::from_config(&config());
        let labels = decoder.decode_batch(&prediction(), &[3, 1]).unwrap();
        assert_eq!(labels, vec![vec![1, 0, 2], vec![0]]);
    }

    #[test]
    fn test_decode_batch_constrained() {
        let decoder = CrfDecoder::from_config(&config().with_constrained_transitions(true));
        let labels = decoder.decode_batch(&prediction(), &[3, 1]).unwrap();
        // O -> I-PER is forbidden; among the tied valid paths the lowest tag wins.
        assert_eq!(labels[0], vec![1, 0, 0]);
        assert_eq!(labels[1], vec![0]);

        let tags = config().tags;
        assert!(labels[0].windows(2).all(|w| tags.is_valid_transition(w[0], w[1])));
    }

    #[test]
    fn test_decode_batch_validates_shape() {
        let decoder = CrfDecoder::from_config(&config());
        let err = decoder.decode_batch(&prediction(), &[3]).unwrap_err();
        assert!(matches!(err, NerError::MalformedResponse(_)));
    }
}
