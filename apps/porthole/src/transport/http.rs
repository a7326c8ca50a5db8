use super::{ConsoleTransport, TransportError, event_url};
use crate::telemetry::{PerfGuard, record_bytes};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, trace};
use url::Url;

/// Console host reached over plain HTTP(S).
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: Client,
    update_url: Url,
    event_url: Url,
}

impl HttpTransport {
    pub fn new(update_url: Url, timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder()
            .connect_timeout(timeout.min(Duration::from_secs(10)))
            .timeout(timeout)
            .build()?;
        let event_url = event_url(&update_url);
        debug!(
            target: "porthole::transport",
            update_url = %update_url,
            timeout_ms = timeout.as_millis() as u64,
            "http transport ready"
        );
        Ok(Self {
            client,
            update_url,
            event_url,
        })
    }

    pub fn update_url(&self) -> &Url {
        &self.update_url
    }
}

#[async_trait]
impl ConsoleTransport for HttpTransport {
    async fn send_events(&self, payload: &str) -> Result<(), TransportError> {
        let _guard = PerfGuard::new("transport_send_events");
        record_bytes("transport_event_bytes", payload.len());
        let response = self
            .client
            .post(self.event_url.clone())
            .form(&[("data", payload)])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(TransportError::HttpStatus {
                method: "POST",
                url: self.event_url.clone(),
                status: response.status(),
            });
        }
        trace!(target: "porthole::transport", bytes = payload.len(), "event bag posted");
        Ok(())
    }

    async fn poll_update(&self) -> Result<String, TransportError> {
        let _guard = PerfGuard::new("transport_poll_update");
        let response = self.client.get(self.update_url.clone()).send().await?;
        if !response.status().is_success() {
            return Err(TransportError::HttpStatus {
                method: "GET",
                url: self.update_url.clone(),
                status: response.status(),
            });
        }
        let body = response.text().await?;
        record_bytes("transport_update_bytes", body.len());
        trace!(target: "porthole::transport", bytes = body.len(), "update received");
        Ok(body)
    }

    async fn fetch_image(&self, url: &Url) -> Result<Bytes, TransportError> {
        let _guard = PerfGuard::new("transport_fetch_image");
        let response = self.client.get(url.clone()).send().await?;
        if !response.status().is_success() {
            return Err(TransportError::HttpStatus {
                method: "GET",
                url: url.clone(),
                status: response.status(),
            });
        }
        let bytes = response.bytes().await?;
        record_bytes("transport_image_bytes", bytes.len());
        Ok(bytes)
    }
}
