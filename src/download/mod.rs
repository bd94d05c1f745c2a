//! Concurrent chunked-download engine: byte-range planning, parallel ranged
//! fetches, ordered merge, and the manifest → post → file → chunk fan-out.

pub mod chunk_fetch;
pub mod chunk_plan;
pub mod error;
pub mod job;
pub mod merge;
pub mod post;
pub mod walker;

#[cfg(test)]
mod test_server;
