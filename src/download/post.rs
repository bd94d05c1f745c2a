use std::path::Path;
use std::sync::Arc;

use log::{error, info};
use reqwest::Client;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::config::Config;
use crate::download::error::DownloadError;
use crate::download::job::{DownloadJob, JobOutcome};
use crate::manifest::Post;
use crate::utils::sanitize_filename;

pub struct FileOutcome {
    pub file_name: String,
    pub url: String,
    pub result: Result<JobOutcome, DownloadError>,
}

/// Outcome of one post. A post with failed files still counts as processed;
/// failures are carried as data, not bubbled up.
pub struct PostReport {
    pub post_id: String,
    pub setup_error: Option<std::io::Error>,
    pub files: Vec<FileOutcome>,
}

impl PostReport {
    pub fn failed_files(&self) -> usize {
        self.files.iter().filter(|f| f.result.is_err()).count()
    }

    pub fn is_complete_success(&self) -> bool {
        self.setup_error.is_none() && self.failed_files() == 0
    }
}

/// Downloads all files of one post into `<base_folder>/<post.id>/`, at most
/// `parallel_files` jobs in flight at a time. Each job additionally fans out
/// to its own chunk-level connections, so the two bounds multiply.
pub struct PostProcessor {
    client: Client,
    parallel_files: usize,
    connection_count: usize,
    retry_times: usize,
}

impl PostProcessor {
    pub fn new(client: Client, config: &Config) -> Self {
        Self {
            client,
            parallel_files: config.parallel_files,
            connection_count: config.connection_count,
            retry_times: config.retry_times,
        }
    }

    pub async fn run(&self, post: &Post, base_folder: &Path, cancel: &CancellationToken) -> PostReport {
        info!("Processing post {}", post.id);

        let post_dir = base_folder.join(&post.id);
        if let Err(err) = tokio::fs::create_dir_all(&post_dir).await {
            error!("Cannot create post dir {:?}: {}", post_dir, err);
            return PostReport {
                post_id: post.id.clone(),
                setup_error: Some(err),
                files: Vec::new(),
            };
        }

        let semaphore = Arc::new(Semaphore::new(self.parallel_files.max(1)));
        let mut handles: Vec<(String, String, JoinHandle<Result<JobOutcome, DownloadError>>)> =
            Vec::with_capacity(post.files.len());

        for (index, file) in post.files.iter().enumerate() {
            let file_name = format!("{}-{}", index + 1, sanitize_filename(&file.name));
            let destination = post_dir.join(&file_name);

            let handle = match Url::parse(&file.url) {
                Ok(url) => {
                    let job = DownloadJob::new(
                        self.client.clone(),
                        url,
                        destination,
                        self.connection_count,
                        self.retry_times,
                    );
                    let semaphore = semaphore.clone();
                    let cancel = cancel.clone();
                    tokio::spawn(async move {
                        let _permit = semaphore.acquire_owned().await.unwrap();
                        job.run(&cancel).await
                    })
                }
                Err(source) => {
                    let url = file.url.clone();
                    tokio::spawn(async move {
                        Err::<JobOutcome, _>(DownloadError::InvalidUrl { url, source })
                    })
                }
            };

            handles.push((file_name, file.url.clone(), handle));
        }

        // Outcomes are awaited in file order; a failed sibling never cancels
        // the others.
        let mut files = Vec::with_capacity(handles.len());
        for (file_name, url, handle) in handles {
            let result = match handle.await {
                Ok(result) => result,
                Err(join_err) => Err(DownloadError::Worker(join_err)),
            };

            if let Err(err) = &result {
                error!("Post {}: {} failed: {}", post.id, file_name, err);
            }

            files.push(FileOutcome {
                file_name,
                url,
                result,
            });
        }

        let report = PostReport {
            post_id: post.id.clone(),
            setup_error: None,
            files,
        };

        info!(
            "Post {} processed: {} file(s), {} failed",
            report.post_id,
            report.files.len(),
            report.failed_files()
        );

        report
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::download::test_server::{ServedFile, TestServer};
    use crate::manifest::FileRef;

    fn config() -> Config {
        Config {
            connection_count: 4,
            parallel_files: 3,
            retry_times: 2,
            ..Config::default()
        }
    }

    fn post(id: &str, files: Vec<(&str, Url)>) -> Post {
        Post {
            id: id.to_string(),
            files: files
                .into_iter()
                .map(|(name, url)| FileRef {
                    name: name.to_string(),
                    url: url.to_string(),
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn one_failed_file_does_not_cancel_its_siblings() {
        let body = vec![9u8; 1024];
        let server = TestServer::spawn(HashMap::from([
            ("/one".to_string(), ServedFile::new(body.clone())),
            (
                "/two".to_string(),
                ServedFile::new(body.clone()).fail_first(usize::MAX),
            ),
            ("/three".to_string(), ServedFile::new(body.clone())),
        ]))
        .await;

        let base = tempfile::tempdir().unwrap();
        let post = post(
            "post-1",
            vec![
                ("first file.bin", server.url("/one")),
                ("second file.bin", server.url("/two")),
                ("third file.bin", server.url("/three")),
            ],
        );

        let processor = PostProcessor::new(Client::new(), &config());
        let report = processor
            .run(&post, base.path(), &CancellationToken::new())
            .await;

        assert_eq!(report.files.len(), 3);
        assert_eq!(report.failed_files(), 1);
        assert!(report.files[0].result.is_ok());
        assert!(report.files[1].result.is_err());
        assert!(report.files[2].result.is_ok());

        let post_dir = base.path().join("post-1");
        assert_eq!(std::fs::read(post_dir.join("1-first_file.bin")).unwrap(), body);
        assert!(!post_dir.join("2-second_file.bin").exists());
        assert_eq!(std::fs::read(post_dir.join("3-third_file.bin")).unwrap(), body);
    }

    #[tokio::test]
    async fn destinations_are_indexed_and_sanitized() {
        let server = TestServer::spawn(HashMap::from([(
            "/f".to_string(),
            ServedFile::new(vec![1u8; 16]),
        )]))
        .await;

        let base = tempfile::tempdir().unwrap();
        let post = post("p", vec![("we?ird/na me.png", server.url("/f"))]);

        let processor = PostProcessor::new(Client::new(), &config());
        let report = processor
            .run(&post, base.path(), &CancellationToken::new())
            .await;

        assert!(report.is_complete_success());
        assert!(base.path().join("p/1-weirdna_me.png").exists());
    }

    #[tokio::test]
    async fn unparsable_url_is_reported_per_file() {
        let base = tempfile::tempdir().unwrap();
        let post = Post {
            id: "p".to_string(),
            files: vec![FileRef {
                name: "bad.bin".to_string(),
                url: "not a url".to_string(),
            }],
        };

        let processor = PostProcessor::new(Client::new(), &config());
        let report = processor
            .run(&post, base.path(), &CancellationToken::new())
            .await;

        assert_eq!(report.failed_files(), 1);
        assert!(matches!(
            report.files[0].result,
            Err(DownloadError::InvalidUrl { .. })
        ));
    }
}
