// HTTP feed client - Streams newline-delimited JSON samples into the fleet
use crate::application::fleet_service::FleetHandle;
use crate::application::telemetry_source::{FeedError, TelemetrySource};
use crate::infrastructure::wire::decode_sample;
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct HttpFeedSource {
    client: reqwest::Client,
    url: String,
    reconnect_delay: Duration,
}

impl HttpFeedSource {
    pub fn new(url: String, reconnect_delay: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
            reconnect_delay,
        }
    }

    /// Reads one connection until the remote closes it.
    async fn consume(&self, fleet: &FleetHandle) -> Result<(), FeedError> {
        let response = self
            .client
            .get(&self.url)
            .header(reqwest::header::ACCEPT, "application/x-ndjson")
            .send()
            .await?
            .error_for_status()?;

        tracing::info!("Connected to feed {}", self.url);

        let mut lines = std::pin::pin!(ndjson_lines(response.bytes_stream(), MAX_LINE_BYTES));
        while let Some(line) = lines.next().await {
            let line = line?;
            match decode_sample(&line) {
                Ok(sample) => fleet.process(sample).await?,
                Err(e) => tracing::debug!("Skipping undecodable line from {}: {}", self.url, e),
            }
        }

        Ok(())
    }
}

#[async_trait]
impl TelemetrySource for HttpFeedSource {
    async fn run(&self, fleet: FleetHandle) -> Result<(), FeedError> {
        loop {
            match self.consume(&fleet).await {
                Ok(()) => tracing::info!("Feed {} closed by remote", self.url),
                Err(FeedError::Fleet(closed)) => return Err(closed.into()),
                Err(e) => tracing::warn!("Feed {} failed: {}", self.url, e),
            }

            // The producer may have restarted while we were away
            fleet.be_ready_to_reset().await?;

            tracing::info!(
                "Reconnecting to {} in {}ms",
                self.url,
                self.reconnect_delay.as_millis()
            );
            tokio::time::sleep(self.reconnect_delay).await;
        }
    }
}

/// Longest line accepted from a feed; longer lines are dropped whole.
pub const MAX_LINE_BYTES: usize = 64 * 1024;

/// Splits a chunked byte stream into trimmed, non-empty lines.
///
/// Lines may span chunks. A trailing line without a newline is emitted when
/// the stream ends. Lines over `max_line_bytes` and lines that are not UTF-8
/// are skipped, and at most `max_line_bytes` are buffered while waiting for a
/// newline.
pub fn ndjson_lines<S, E>(chunks: S, max_line_bytes: usize) -> impl Stream<Item = Result<String, E>>
where
    S: Stream<Item = Result<Bytes, E>>,
{
    async_stream::try_stream! {
        let mut buffer = BytesMut::new();
        // Bytes of `buffer` already known to hold no newline
        let mut scanned = 0;
        // Inside an oversized line whose head was already thrown away
        let mut discarding = false;

        for await chunk in chunks {
            buffer.extend_from_slice(&chunk?);
            while let Some(offset) = buffer[scanned..].iter().position(|b| *b == b'\n') {
                let raw = buffer.split_to(scanned + offset + 1);
                scanned = 0;
                if discarding || raw.len() > max_line_bytes + 1 {
                    discarding = false;
                    continue;
                }
                if let Some(line) = to_line(&raw) {
                    yield line;
                }
            }

            scanned = buffer.len();
            if scanned > max_line_bytes {
                if !discarding {
                    tracing::warn!("Dropping feed line longer than {} bytes", max_line_bytes);
                }
                discarding = true;
                buffer.clear();
                scanned = 0;
            }
        }

        if !discarding {
            if let Some(line) = to_line(&buffer) {
                yield line;
            }
        }
    }
}

fn to_line(raw: &[u8]) -> Option<String> {
    let text = match std::str::from_utf8(raw) {
        Ok(text) => text,
        Err(e) => {
            tracing::debug!("Skipping feed line that is not UTF-8: {}", e);
            return None;
        }
    };
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
