//! # Remote Scorer
//!
//! Sends a feed dictionary to a model-serving endpoint and returns the tag
//! scores and transition matrix it answers with.

use reqwest::StatusCode;
use reqwest::blocking::Client;
use tracing::{debug, error};

use crate::config::ClientConfig;
use crate::error::{NerError, Result};
use crate::serving::feed::FeedDict;
use crate::types::Prediction;

/// Something that scores a batch: produces logits and transition params.
pub trait Scorer {
    fn score(&self, feed: &FeedDict) -> Result<Prediction>;
}

impl<S: Scorer + ?Sized> Scorer for &S {
    fn score(&self, feed: &FeedDict) -> Result<Prediction> {
        (**self).score(feed)
    }
}

/// Blocking HTTP scorer: one POST per batch, no retries.
#[derive(Debug, Clone)]
pub struct HttpScorer {
    client: Client,
    config: ClientConfig,
}

impl HttpScorer {
    /// Create a scorer for the given endpoint.
    pub fn new(config: ClientConfig) -> Result<Self> {
        // Without an explicit timeout the blocking client waits indefinitely.
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    /// Create a scorer posting to `url` with no timeout.
    pub fn with_url(url: impl Into<String>) -> Result<Self> {
        Self::new(ClientConfig::new(url))
    }

    pub fn url(&self) -> &str {
        &self.config.url
    }
}

impl Scorer for HttpScorer {
    fn score(&self, feed: &FeedDict) -> Result<Prediction> {
        debug!(
            url = %self.config.url,
            batch = feed.batch_size(),
            max_len = feed.max_len(),
            "posting prediction request"
        );

        let response = self.client.post(&self.config.url).json(feed).send()?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().unwrap_or_default();
            error!(url = %self.config.url, status = status.as_u16(), "remote prediction failed");
            return Err(NerError::RemotePredictionFailed {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes()?;
        let prediction: Prediction = serde_json::from_slice(&bytes)?;
        Ok(prediction)
    }
}
