//! Forwarding of realtime events to a hosted pub/sub endpoint.

use crate::core::Config;
use crate::realtime::RealtimeEvent;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};
use serde::Serialize;
use sha2::Sha256;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "X-Relay-Signature";

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("relay request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("could not encode event: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("relay secret rejected")]
    InvalidKey,
}

#[derive(Serialize)]
struct RelayBody<'a> {
    channel: &'a str,
    event: &'a str,
    data: &'a serde_json::Value,
}

#[derive(Clone)]
pub struct RelayClient {
    http: reqwest::Client,
    url: String,
    secret: Option<String>,
}

impl RelayClient {
    pub fn new(http: reqwest::Client, url: impl Into<String>, secret: Option<String>) -> Self {
        Self {
            http,
            url: url.into(),
            secret,
        }
    }

    /// `None` unless `REALTIME_RELAY_URL` is configured
    pub fn from_config(config: &Config, http: reqwest::Client) -> Option<Self> {
        let url = config.realtime_relay_url.as_ref()?;
        if config.realtime_relay_secret.is_none() {
            warn!("Realtime relay enabled without a signing secret");
        }
        info!("Realtime relay enabled");
        Some(Self::new(
            http,
            url.clone(),
            config.realtime_relay_secret.clone(),
        ))
    }

    pub fn signature(&self, body: &[u8]) -> Result<Option<String>, RelayError> {
        let Some(secret) = &self.secret else {
            return Ok(None);
        };
        let mut mac =
            HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| RelayError::InvalidKey)?;
        mac.update(body);
        Ok(Some(STANDARD.encode(mac.finalize().into_bytes())))
    }

    #[instrument(skip(self, event), fields(event = %event.kind))]
    pub async fn send(&self, channel: &str, event: &RealtimeEvent) -> Result<(), RelayError> {
        let body = serde_json::to_vec(&RelayBody {
            channel,
            event: &event.kind,
            data: &event.data,
        })?;

        let mut request = self
            .http
            .post(&self.url)
            .header(reqwest::header::CONTENT_TYPE, "application/json");
        if let Some(signature) = self.signature(&body)? {
            request = request.header(SIGNATURE_HEADER, signature);
        }
        request.body(body).send().await?.error_for_status()?;
        debug!("Event relayed");
        Ok(())
    }

    /// Sends on a detached task; failures are only logged.
    pub fn forward(&self, channel: String, event: Arc<RealtimeEvent>) {
        let client = self.clone();
        tokio::spawn(async move {
            if let Err(e) = client.send(&channel, &event).await {
                warn!("Realtime relay failed for {}: {}", channel, e);
            }
        });
    }
}
