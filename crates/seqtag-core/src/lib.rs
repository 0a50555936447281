//! # Seqtag Core
//!
//! Serving adapter for pre-trained CRF sequence taggers. Batches encoded
//! sentences, scores them on a remote model server, decodes label paths with
//! Viterbi over the returned transition matrix and exports model variables
//! into servable packages.
//!
//! ## Quick Start
//!
//! ```no_run
//! use seqtag_core::{NerConfig, ServingModel, Token};
//!
//! let config = NerConfig::new().with_chars(false);
//! let model = ServingModel::new(config, "http://localhost:8501/v1/models/ner:predict").unwrap();
//!
//! let sentence = vec![Token::word(12), Token::word(7), Token::word(3), Token::word(96)];
//! let (labels, lengths) = model.predict_batch(&[sentence]).unwrap();
//!
//! assert_eq!(labels[0].len(), lengths[0]);
//! ```
pub mod config;
pub mod decode;
pub mod error;
pub mod export;
pub mod serving;
pub mod types;

// Re-export primary API
pub use config::{ClientConfig, DecodeMode, NerConfig};
pub use decode::{Chunk, CrfDecoder, TagSet, ViterbiDecoder};
pub use error::{NerError, Result};
pub use export::{ExportManifest, SavedModel, ServableExporter, SignatureDef, TrainedModel};
pub use serving::{FeedDict, HttpScorer, Scorer, ServingModel};
pub use types::{Metrics, Prediction, Sentence, Token};
