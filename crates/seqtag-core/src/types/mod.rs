pub mod metrics;
pub mod prediction;
pub mod token;

pub use metrics::{Metrics, MetricsAccumulator};
pub use prediction::Prediction;
pub use token::{Sentence, Token};
