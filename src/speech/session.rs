//! URLs and pairing keys for the full-duplex speech service.
//!
//! Each recognition attempt uses two HTTP streams: an upload (`POST .../up`)
//! carrying the audio, and a download (`GET .../down`) returning results. The
//! service correlates them through the `pair` query parameter.

use crate::config::ServiceConfig;
use crate::error::{ChunkscribeError, Result};
use reqwest::Url;
use std::fmt;

/// Random token tying one upload stream to one download stream.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PairingKey(String);

impl PairingKey {
    /// Generate a fresh random key (32 random bits as lowercase hex).
    pub fn generate() -> Self {
        Self(format!("{:x}", rand::random::<u32>()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PairingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Validated service location and credentials.
#[derive(Debug, Clone)]
pub struct ServiceEndpoint {
    base: String,
    api_key: String,
    client: String,
}

impl ServiceEndpoint {
    /// Build an endpoint from configuration.
    ///
    /// # Errors
    /// Returns `ChunkscribeError::Configuration` if the API key is missing or
    /// blank, or the endpoint is not a valid URL.
    pub fn new(config: &ServiceConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or_else(|| {
                ChunkscribeError::config(
                    "speech service API key is not set. \
                     Set service.api_key in the config file or CHUNKSCRIBE_API_KEY",
                )
            })?;

        let base = config.endpoint.trim_end_matches('/').to_string();
        Url::parse(&base).map_err(|e| {
            ChunkscribeError::config(format!("invalid service endpoint '{}': {e}", config.endpoint))
        })?;

        Ok(Self {
            base,
            api_key: api_key.to_string(),
            client: config.client.clone(),
        })
    }

    /// URL of the upload stream for `pair`.
    pub fn upload_url(&self, pair: &PairingKey, language: &str) -> Result<Url> {
        let mut url = self.join("up")?;
        url.query_pairs_mut()
            .append_pair("output", "json")
            .append_pair("lang", language)
            .append_pair("pfilter", "2")
            .append_pair("key", &self.api_key)
            .append_pair("client", &self.client)
            .append_pair("maxAlternatives", "1")
            .append_pair("pair", pair.as_str())
            .append_key_only("continuous")
            .append_key_only("interim");
        Ok(url)
    }

    /// URL of the download stream for `pair`.
    pub fn download_url(&self, pair: &PairingKey) -> Result<Url> {
        let mut url = self.join("down")?;
        url.query_pairs_mut().append_pair("pair", pair.as_str());
        Ok(url)
    }

    fn join(&self, stream: &str) -> Result<Url> {
        let raw = format!("{}/{stream}", self.base);
        Url::parse(&raw)
            .map_err(|e| ChunkscribeError::config(format!("invalid service URL '{raw}': {e}")))
    }
}

/// `content-type` header of an upload at `sample_rate`.
pub fn content_type(sample_rate: u32) -> String {
    format!("audio/x-flac; rate={sample_rate}")
}

/// Host and path of `url`, without the query string that carries the API key.
pub fn redacted(url: &Url) -> String {
    format!("{}{}", url.host_str().unwrap_or_default(), url.path())
}
