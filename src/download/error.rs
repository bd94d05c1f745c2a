use std::path::PathBuf;
use thiserror::Error;
use tokio::io;

/// Terminal failure of a single chunk, surfaced after the retry budget
/// for its range is exhausted.
#[derive(Error, Debug)]
pub enum ChunkFetchError {
    #[error("chunk {index} ({span}): request failed: {source}")]
    Request {
        index: usize,
        span: String,
        source: reqwest::Error,
    },

    #[error("chunk {index} ({span}): unexpected status {status}")]
    Status {
        index: usize,
        span: String,
        status: reqwest::StatusCode,
    },

    #[error("chunk {index} ({span}): expected {expected} bytes, received {actual}")]
    SizeMismatch {
        index: usize,
        span: String,
        expected: u64,
        actual: u64,
    },

    #[error("chunk {index} ({span}): write failed: {source}")]
    Io {
        index: usize,
        span: String,
        source: io::Error,
    },
}

impl ChunkFetchError {
    pub fn index(&self) -> usize {
        match self {
            Self::Request { index, .. }
            | Self::Status { index, .. }
            | Self::SizeMismatch { index, .. }
            | Self::Io { index, .. } => *index,
        }
    }
}

#[derive(Error, Debug)]
pub enum MergeError {
    #[error("chunk artifact {index} missing at {path:?}")]
    MissingChunk { index: usize, path: PathBuf },

    #[error("IOError: {:?}", .0)]
    Io(#[from] io::Error),
}

/// Failure of one download job. Jobs are isolated per file; these never
/// terminate the run, they are collected into per-post reports.
#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("invalid url {url}: {source}")]
    InvalidUrl {
        url: String,
        source: url::ParseError,
    },

    #[error("size probe for {url} failed: {source}")]
    Probe {
        url: String,
        source: reqwest::Error,
    },

    #[error("download of {url} failed: {source}")]
    Chunk {
        url: String,
        source: ChunkFetchError,
    },

    #[error("merge for {url} failed: {source}")]
    Merge { url: String, source: MergeError },

    #[error("download cancelled")]
    Cancelled,

    #[error("worker task failed: {0}")]
    Worker(#[from] tokio::task::JoinError),

    #[error("IOError: {:?}", .0)]
    Io(#[from] io::Error),
}
