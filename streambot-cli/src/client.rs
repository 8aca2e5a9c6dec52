use std::time::Duration;

use encoding_rs::{CoderResult, Decoder, UTF_8};
use futures::StreamExt;
use streambot_shared::ChatRequest;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};
use url::Url;

use crate::error::StreamError;

const STREAM_PATH: &str = "api/chat/stream";

/// Streams assistant text from the backend's chunked endpoint.
#[derive(Debug, Clone)]
pub struct StreamClient {
    http: reqwest::Client,
    endpoint: Url,
}

impl StreamClient {
    pub fn new(base_url: &Url, timeout: Option<Duration>) -> anyhow::Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            http: builder.build()?,
            endpoint: endpoint_for(base_url)?,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// POSTs `request` and hands every decoded, non-empty piece of the body
    /// to `on_chunk` in arrival order. Returns once the body ends, the request
    /// fails, or `cancel` fires.
    pub async fn stream_chat<F>(
        &self,
        request: &ChatRequest,
        cancel: &CancellationToken,
        mut on_chunk: F,
    ) -> Result<(), StreamError>
    where
        F: FnMut(&str),
    {
        if cancel.is_cancelled() {
            return Err(StreamError::Aborted);
        }

        info!("POST {} ({} history messages)", self.endpoint, request.history.len());
        let pending = self.http.post(self.endpoint.clone()).json(request).send();
        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(StreamError::Aborted),
            response = pending => response?,
        };

        let status = response.status();
        if !status.is_success() {
            let body = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(StreamError::Aborted),
                body = response.text() => body.unwrap_or_default(),
            };
            warn!("Backend answered {}: {}", status, body);
            return Err(StreamError::request_failed(status, body));
        }
        debug!("Backend answered {}, reading body", status);

        // Dropping the stream on any return below releases the connection.
        let body = response.bytes_stream();
        futures::pin_mut!(body);
        let mut decoder = Utf8Decoder::default();
        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!("Stream cancelled mid-body");
                    return Err(StreamError::Aborted);
                }
                next = body.next() => next,
            };
            match next {
                Some(bytes) => {
                    let bytes = bytes?;
                    let text = decoder.decode(&bytes);
                    trace!("Read {} bytes, decoded {} chars", bytes.len(), text.chars().count());
                    if !text.is_empty() {
                        on_chunk(&text);
                    }
                }
                None => {
                    let tail = decoder.finish();
                    if !tail.is_empty() {
                        on_chunk(&tail);
                    }
                    return Ok(());
                }
            }
        }
    }
}

fn endpoint_for(base_url: &Url) -> Result<Url, url::ParseError> {
    // Without a trailing slash `join` would replace the last path segment.
    let mut base = base_url.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join(STREAM_PATH)
}

/// Incremental UTF-8 decoding across arbitrary read boundaries.
///
/// A multi-byte character split between two reads is held back until the
/// rest of it arrives. Invalid sequences become U+FFFD.
pub struct Utf8Decoder {
    inner: Decoder,
}

impl Default for Utf8Decoder {
    fn default() -> Self {
        Self {
            inner: UTF_8.new_decoder(),
        }
    }
}

impl std::fmt::Debug for Utf8Decoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Utf8Decoder").finish_non_exhaustive()
    }
}

impl Utf8Decoder {
    pub fn decode(&mut self, bytes: &[u8]) -> String {
        self.decode_inner(bytes, false)
    }

    /// Flushes whatever is still buffered once the input has ended.
    pub fn finish(mut self) -> String {
        self.decode_inner(&[], true)
    }

    fn decode_inner(&mut self, mut bytes: &[u8], last: bool) -> String {
        let mut out = String::new();
        loop {
            let needed = self
                .inner
                .max_utf8_buffer_length(bytes.len())
                .unwrap_or(bytes.len() * 3 + 4);
            out.reserve(needed);
            let (result, read, _) = self.inner.decode_to_string(bytes, &mut out, last);
            bytes = &bytes[read..];
            match result {
                CoderResult::InputEmpty => return out,
                CoderResult::OutputFull => continue,
            }
        }
    }
}
