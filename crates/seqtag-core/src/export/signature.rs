//! Input/output bindings of the served prediction graph.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::NerConfig;

/// Tag under which the serving graph is registered.
pub const SERVING_TAG: &str = "serve";

/// Signature key looked up by serving processes when none is requested.
pub const DEFAULT_SIGNATURE_KEY: &str = "serving_default";

pub const PREDICT_METHOD_NAME: &str = "tensorflow/serving/predict";

/// Dimension size meaning "any length".
pub const DYNAMIC: i64 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DType {
    Int32,
    Float32,
}

/// Element type and shape of one bound tensor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TensorSpec {
    pub dtype: DType,
    pub shape: Vec<i64>,
}

/// Named inputs and outputs of a servable method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureDef {
    pub method_name: String,
    pub inputs: BTreeMap<String, TensorSpec>,
    pub outputs: BTreeMap<String, TensorSpec>,
}

impl TensorSpec {
    pub fn new(dtype: DType, shape: Vec<i64>) -> Self {
        Self { dtype, shape }
    }
}

impl SignatureDef {
    /// Prediction signature for a tagger with the given configuration.
    ///
    /// Inputs are `word_ids`, `sequence_lengths` and `dropout`, plus
    /// `char_ids` and `word_lengths` for char-level models. Outputs are
    /// `logits` and `trans_params`.
    pub fn predict(config: &NerConfig) -> Self {
        let ntags = config.ntags() as i64;

        let mut inputs = BTreeMap::new();
        inputs.insert(
            "word_ids".to_string(),
            TensorSpec::new(DType::Int32, vec![DYNAMIC, DYNAMIC]),
        );
        inputs.insert(
            "sequence_lengths".to_string(),
            TensorSpec::new(DType::Int32, vec![DYNAMIC]),
        );
        inputs.insert("dropout".to_string(), TensorSpec::new(DType::Float32, vec![]));
        if config.use_chars {
            inputs.insert(
                "char_ids".to_string(),
                TensorSpec::new(DType::Int32, vec![DYNAMIC, DYNAMIC, DYNAMIC]),
            );
            inputs.insert(
                "word_lengths".to_string(),
                TensorSpec::new(DType::Int32, vec![DYNAMIC, DYNAMIC]),
            );
        }

        let mut outputs = BTreeMap::new();
        outputs.insert(
            "logits".to_string(),
            TensorSpec::new(DType::Float32, vec![DYNAMIC, DYNAMIC, ntags]),
        );
        outputs.insert(
            "trans_params".to_string(),
            TensorSpec::new(DType::Float32, vec![ntags, ntags]),
        );

        Self {
            method_name: PREDICT_METHOD_NAME.to_string(),
            inputs,
            outputs,
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int32 => write!(f, "int32"),
            Self::Float32 => write!(f, "float32"),
        }
    }
}

impl fmt::Display for TensorSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dims: Vec<String> = self
            .shape
            .iter()
            .map(|&d| if d == DYNAMIC { "?".to_string() } else { d.to_string() })
            .collect();
        write!(f, "{}[{}]", self.dtype, dims.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_words_only() {
        let config = NerConfig::new().with_chars(false);
        let sig = SignatureDef::predict(&config);

        let inputs: Vec<&str> = sig.inputs.keys().map(String::as_str).collect();
        assert_eq!(inputs, vec!["dropout", "sequence_lengths", "word_ids"]);
        let outputs: Vec<&str> = sig.outputs.keys().map(String::as_str).collect();
        assert_eq!(outputs, vec!["logits", "trans_params"]);

        assert_eq!(sig.outputs["trans_params"].shape, vec![9, 9]);
        assert_eq!(sig.inputs["dropout"].dtype, DType::Float32);
    }

    #[test]
    fn test_signature_with_chars() {
        let sig = SignatureDef::predict(&NerConfig::new().with_chars(true));
        assert!(sig.inputs.contains_key("char_ids"));
        assert!(sig.inputs.contains_key("word_lengths"));
    }

    #[test]
    fn test_tensor_spec_display() {
        let spec = TensorSpec::new(DType::Float32, vec![DYNAMIC, DYNAMIC, 9]);
        assert_eq!(spec.to_string(), "float32[?, ?, 9]");
        assert_eq!(TensorSpec::new(DType::Float32, vec![]).to_string(), "float32[]");
    }
}
