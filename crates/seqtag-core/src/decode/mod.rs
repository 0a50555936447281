pub mod crf;
pub mod tags;
pub mod viterbi;

pub use crf::CrfDecoder;
pub use tags::{Chunk, OUTSIDE, TagClass, TagSet};
pub use viterbi::ViterbiDecoder;
