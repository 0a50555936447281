pub mod client;
pub mod feed;
pub mod model;

pub use client::{HttpScorer, Scorer};
pub use feed::{FeedDict, INFERENCE_DROPOUT, PAD_ID, pad_char_sequences, pad_sequences};
pub use model::ServingModel;
