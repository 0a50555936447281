//! # Model and Client Configuration
//!
//! `NerConfig` describes the served model: its tag vocabulary, decoding mode
//! and the feature dimensions recorded in exports. `ClientConfig` describes
//! how to reach the serving endpoint.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::decode::tags::TagSet;
use crate::error::{NerError, Result};

/// How tag scores are turned into label sequences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecodeMode {
    /// Transition-aware decoding over the CRF trellis.
    #[default]
    Viterbi,
    /// Per-position argmax without transitions. Not served.
    Argmax,
}

impl fmt::Display for DecodeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Viterbi => write!(f, "viterbi"),
            Self::Argmax => write!(f, "argmax"),
        }
    }
}

/// Configuration of a served sequence tagger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NerConfig {
    /// Tag vocabulary ordered by label id.
    pub tags: TagSet,
    pub decode_mode: DecodeMode,
    /// Whether sentences carry character ids next to word ids.
    pub use_chars: bool,
    /// Forbid BIO-invalid transitions while decoding.
    pub constrain_transitions: bool,
    pub nwords: usize,
    pub nchars: usize,
    pub dim_word: usize,
    pub dim_char: usize,
    pub hidden_size_char: usize,
    pub hidden_size_lstm: usize,
    /// Sentences per request when evaluating.
    pub batch_size: usize,
}

impl Default for NerConfig {
    fn default() -> Self {
        Self {
            tags: TagSet::conll(),
            decode_mode: DecodeMode::Viterbi,
            use_chars: true,
            constrain_transitions: false,
            nwords: 0,
            nchars: 0,
            dim_word: 300,
            dim_char: 100,
            hidden_size_char: 100,
            hidden_size_lstm: 300,
            batch_size: 20,
        }
    }
}

impl NerConfig {
    /// Create a configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a configuration from a JSON file and validate it.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Number of distinct tags.
    pub fn ntags(&self) -> usize {
        self.tags.len()
    }

    pub fn with_tags(mut self, tags: TagSet) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_decode_mode(mut self, mode: DecodeMode) -> Self {
        self.decode_mode = mode;
        self
    }

    pub fn with_chars(mut self, enabled: bool) -> Self {
        self.use_chars = enabled;
        self
    }

    pub fn with_constrained_transitions(mut self, enabled: bool) -> Self {
        self.constrain_transitions = enabled;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Fail unless label paths are decoded with Viterbi.
    pub fn ensure_viterbi(&self) -> Result<()> {
        match self.decode_mode {
            DecodeMode::Viterbi => Ok(()),
            mode => Err(NerError::UnsupportedDecodingMode { mode }),
        }
    }

    /// Check invariants that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(NerError::InvalidConfig("batch_size must be positive".into()));
        }
        Ok(())
    }
}

/// Connection settings for the remote scorer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Full prediction URL, e.g. `http://localhost:8501/v1/models/ner:predict`.
    pub url: String,
    /// Request timeout. `None` blocks until the server answers.
    pub timeout: Option<Duration>,
}

impl ClientConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}
