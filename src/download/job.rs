use std::path::PathBuf;

use futures_util::stream::FuturesUnordered;
use futures_util::StreamExt;
use log::{debug, info};
use reqwest::Client;
use tokio::fs;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::download::chunk_fetch::ChunkFetcher;
use crate::download::chunk_plan::plan;
use crate::download::error::DownloadError;
use crate::download::merge::{merge_chunks, remove_artifacts};
use crate::utils::content_length;

#[derive(Debug, PartialEq, Eq)]
pub enum JobOutcome {
    /// The destination already existed; no request was made.
    Skipped,
    Downloaded { bytes: u64 },
}

/// End-to-end download of one URL into one destination file: size probe,
/// chunk planning, parallel ranged fetches, ordered merge, scratch teardown.
/// The job owns its scratch directory for its whole lifetime.
pub struct DownloadJob {
    client: Client,
    url: Url,
    destination: PathBuf,
    connection_count: usize,
    retry_times: usize,
}

impl DownloadJob {
    pub fn new(
        client: Client,
        url: Url,
        destination: PathBuf,
        connection_count: usize,
        retry_times: usize,
    ) -> Self {
        Self {
            client,
            url,
            destination,
            connection_count,
            retry_times,
        }
    }

    /// Scratch dirs sit next to their destination. Destinations are unique
    /// per (post, file), so concurrent jobs never share a scratch path.
    fn scratch_dir(&self) -> PathBuf {
        let mut name = self
            .destination
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".partial");
        self.destination.with_file_name(name)
    }

    pub async fn run(&self, cancel: &CancellationToken) -> Result<JobOutcome, DownloadError> {
        if self.destination.exists() {
            info!(
                "File {:?} already exists. Skipping download.",
                self.destination
            );
            return Ok(JobOutcome::Skipped);
        }

        if cancel.is_cancelled() {
            return Err(DownloadError::Cancelled);
        }

        // Missing or unparsable Content-Length (including servers that
        // reject HEAD) degrades to a single unranged GET via the planner.
        let file_size =
            content_length(&self.client, &self.url)
                .await
                .map_err(|source| DownloadError::Probe {
                    url: self.url.to_string(),
                    source,
                })?;

        let scratch = self.scratch_dir();
        fs::create_dir_all(&scratch).await?;

        let specs = plan(file_size, self.connection_count, &scratch);
        debug!(
            "Downloading {} to {:?} in {} chunk(s)",
            self.url,
            self.destination,
            specs.len()
        );

        let fetcher = ChunkFetcher::new(self.client.clone(), self.url.clone(), self.retry_times);
        let mut in_flight = specs
            .iter()
            .map(|spec| fetcher.fetch(spec))
            .collect::<FuturesUnordered<_>>();

        // Dropping `in_flight` on failure or cancellation aborts the
        // remaining chunk fetches mid-stream.
        let fetched = loop {
            tokio::select! {
                _ = cancel.cancelled() => break Err(DownloadError::Cancelled),
                next = in_flight.next() => match next {
                    Some(Ok(_)) => continue,
                    Some(Err(source)) => break Err(DownloadError::Chunk {
                        url: self.url.to_string(),
                        source,
                    }),
                    None => break Ok(()),
                },
            }
        };
        drop(in_flight);

        if let Err(err) = fetched {
            remove_artifacts(&scratch).await;
            return Err(err);
        }

        let merged = merge_chunks(&specs, &self.destination).await;
        remove_artifacts(&scratch).await;

        match merged {
            Ok(bytes) => {
                info!("Downloaded {} to {:?}", self.url, self.destination);
                Ok(JobOutcome::Downloaded { bytes })
            }
            Err(source) => Err(DownloadError::Merge {
                url: self.url.to_string(),
                source,
            }),
        }
    }
}
