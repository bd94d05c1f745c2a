use std::path::Path;
use std::time::Duration;

use log::info;
use reqwest::Client;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::download::post::{PostProcessor, PostReport};
use crate::manifest::Manifest;

/// Drives posts strictly one at a time, pacing between completions to bound
/// the request rate against the remote service. Never stops at a failed
/// post; every post is attempted and its report collected.
pub struct ManifestWalker {
    processor: PostProcessor,
    pacing: Duration,
    process_from_oldest: bool,
}

impl ManifestWalker {
    pub fn new(client: Client, config: &Config) -> Self {
        Self {
            processor: PostProcessor::new(client, config),
            pacing: config.pacing(),
            process_from_oldest: config.process_from_oldest,
        }
    }

    pub async fn run(
        &self,
        manifest: &Manifest,
        base_folder: &Path,
        cancel: &CancellationToken,
    ) -> Vec<PostReport> {
        // Manifests list newest posts first; oldest-first walks them reversed.
        let posts: Vec<_> = if self.process_from_oldest {
            manifest.posts.iter().rev().collect()
        } else {
            manifest.posts.iter().collect()
        };

        let mut reports = Vec::with_capacity(posts.len());
        for (i, post) in posts.iter().enumerate() {
            if cancel.is_cancelled() {
                info!("Walk cancelled after {} of {} post(s)", i, posts.len());
                break;
            }

            reports.push(self.processor.run(post, base_folder, cancel).await);

            if i + 1 < posts.len() {
                tokio::select! {
                    _ = cancel.cancelled() => {},
                    _ = tokio::time::sleep(self.pacing) => {},
                }
            }
        }

        reports
    }
}
