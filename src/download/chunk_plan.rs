use std::collections::Bound;
use std::fmt;
use std::ops::RangeBounds;
use std::path::{Path, PathBuf};

/// Inclusive byte range of one chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkRange {
    pub start: u64,
    pub end: u64,
}

impl ChunkRange {
    pub fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> u64 {
        (self.end - self.start) + 1
    }

    pub fn to_range_header(&self) -> headers::Range {
        headers::Range::bytes(self).unwrap()
    }
}

impl fmt::Display for ChunkRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bytes {}-{}", self.start, self.end)
    }
}

impl<'a> RangeBounds<u64> for &'a ChunkRange {
    fn start_bound(&self) -> Bound<&u64> {
        Bound::Included(&self.start)
    }

    fn end_bound(&self) -> Bound<&u64> {
        Bound::Included(&self.end)
    }
}

/// One unit of work for a chunk fetcher. `range` is `None` when the resource
/// size is unknown and the whole body is fetched with a single unranged GET.
#[derive(Debug, Clone)]
pub struct ChunkSpec {
    pub index: usize,
    pub range: Option<ChunkRange>,
    pub temp_path: PathBuf,
}

impl ChunkSpec {
    pub fn span(&self) -> String {
        match self.range {
            Some(range) => range.to_string(),
            None => "whole resource".to_string(),
        }
    }
}

/// Partitions `[0, file_size - 1]` into at most `connection_count` contiguous
/// chunks. The last chunk absorbs the division remainder. A zero `file_size`
/// (empty or unknown-length resource) degrades to a single unranged chunk
/// rather than producing empty ranges. Temp paths are scoped to `scratch_dir`
/// so plans of concurrent jobs never collide.
pub fn plan(file_size: u64, connection_count: usize, scratch_dir: &Path) -> Vec<ChunkSpec> {
    let temp_path = |index: usize| scratch_dir.join(format!("{}.chunk", index));

    if file_size == 0 {
        return vec![ChunkSpec {
            index: 0,
            range: None,
            temp_path: temp_path(0),
        }];
    }

    // A file shorter than the connection count gets one chunk per byte at most.
    let count = (connection_count.max(1) as u64).min(file_size);
    let base = file_size / count;

    (0..count)
        .map(|i| {
            let start = i * base;
            let end = if i == count - 1 {
                file_size - 1
            } else {
                (i + 1) * base - 1
            };

            ChunkSpec {
                index: i as usize,
                range: Some(ChunkRange::new(start, end)),
                temp_path: temp_path(i as usize),
            }
        })
        .collect()
}
