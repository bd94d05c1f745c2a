use std::time::Duration;

use futures_util::StreamExt;
use headers::HeaderMapExt;
use log::warn;
use reqwest::{Client, Method, Request, Response, StatusCode};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use url::Url;

use crate::download::chunk_plan::ChunkSpec;
use crate::download::error::ChunkFetchError;

const RETRY_BACKOFF: Duration = Duration::from_millis(300);

/// Fetches single byte ranges of one resource into their temp artifacts.
/// Shared by all chunks of a job; holds no per-chunk state.
pub struct ChunkFetcher {
    client: Client,
    url: Url,
    retry_times: usize,
}

impl ChunkFetcher {
    pub fn new(client: Client, url: Url, retry_times: usize) -> Self {
        Self {
            client,
            url,
            retry_times,
        }
    }

    /// Downloads one chunk, retrying the same range with backoff. Returns the
    /// byte count written to the chunk's temp artifact.
    pub async fn fetch(&self, spec: &ChunkSpec) -> Result<u64, ChunkFetchError> {
        let mut attempts = 0;
        loop {
            match self.fetch_once(spec).await {
                Ok(bytes_written) => return Ok(bytes_written),
                Err(error) => {
                    attempts += 1;
                    if attempts >= self.retry_times.max(1) {
                        return Err(error);
                    }

                    warn!(
                        "Chunk fetch failed, try again {}/{}: {}",
                        attempts, self.retry_times, error
                    );
                    tokio::time::sleep(RETRY_BACKOFF * attempts as u32).await;
                }
            }
        }
    }

    async fn fetch_once(&self, spec: &ChunkSpec) -> Result<u64, ChunkFetchError> {
        let response = self.send_request(spec).await?;

        // Each attempt recreates the artifact, so a partial body from a
        // previous attempt never leaks into the byte count.
        let mut file = File::create(&spec.temp_path)
            .await
            .map_err(|source| ChunkFetchError::Io {
                index: spec.index,
                span: spec.span(),
                source,
            })?;

        let mut bytes_written = 0u64;
        let mut stream = response.bytes_stream();
        while let Some(bytes) = stream.next().await {
            let bytes = bytes.map_err(|source| ChunkFetchError::Request {
                index: spec.index,
                span: spec.span(),
                source,
            })?;

            file.write_all(&bytes)
                .await
                .map_err(|source| ChunkFetchError::Io {
                    index: spec.index,
                    span: spec.span(),
                    source,
                })?;
            bytes_written += bytes.len() as u64;
        }

        file.flush()
            .await
            .map_err(|source| ChunkFetchError::Io {
                index: spec.index,
                span: spec.span(),
                source,
            })?;

        if let Some(range) = spec.range {
            if bytes_written != range.len() {
                return Err(ChunkFetchError::SizeMismatch {
                    index: spec.index,
                    span: spec.span(),
                    expected: range.len(),
                    actual: bytes_written,
                });
            }
        }

        Ok(bytes_written)
    }

    async fn send_request(&self, spec: &ChunkSpec) -> Result<Response, ChunkFetchError> {
        let mut request = Request::new(Method::GET, self.url.clone());
        if let Some(range) = &spec.range {
            request.headers_mut().typed_insert(range.to_range_header());
        }

        let response = self
            .client
            .execute(request)
            .await
            .map_err(|source| ChunkFetchError::Request {
                index: spec.index,
                span: spec.span(),
                source,
            })?;

        let status = response.status();
        if status == StatusCode::PARTIAL_CONTENT || status.is_success() {
            Ok(response)
        } else {
            Err(ChunkFetchError::Status {
                index: spec.index,
                span: spec.span(),
                status,
            })
        }
    }
}
