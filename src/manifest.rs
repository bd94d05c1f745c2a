//! Post manifest parsing. The manifest is immutable once loaded and walked
//! top to bottom by the download engine.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

#[derive(Deserialize, Debug)]
pub struct Manifest {
    #[serde(default)]
    pub posts: Vec<Post>,
}

#[derive(Deserialize, Debug)]
pub struct Post {
    /// Unique per manifest; doubles as the post's directory name.
    pub id: String,
    #[serde(default)]
    pub files: Vec<FileRef>,
}

#[derive(Deserialize, Debug)]
pub struct FileRef {
    pub name: String,
    pub url: String,
}

impl Manifest {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("Reading manifest {:?} failed", path))?;
        let manifest: Manifest = serde_json::from_str(&data)
            .with_context(|| format!("Manifest {:?} is not valid JSON", path))?;

        Ok(manifest)
    }
}
