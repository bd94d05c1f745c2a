use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info};
use tokio_util::sync::CancellationToken;

use crate::cli::CliArgs;
use crate::config::Config;
use crate::download::walker::ManifestWalker;
use crate::manifest::Manifest;

mod cli;
mod config;
mod download;
mod logger;
mod manifest;
mod utils;

#[tokio::main]
async fn main() -> ExitCode {
    let args = CliArgs::parse();

    if let Err(err) = logger::setup_logger(args.verbose) {
        eprintln!("Failed to set up logging: {}", err);
        return ExitCode::FAILURE;
    }

    match run(args).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            error!("{:#}", err);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: CliArgs) -> Result<bool> {
    let manifest_path = PathBuf::from(&args.manifest);
    let manifest = Manifest::load_from_file(&manifest_path)?;

    let config = Config::load_or_default(Path::new(&args.config))
        .with_context(|| format!("Reading config {} failed", args.config))?;
    config.validate()?;

    let base_folder = manifest_path
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join("posts");
    std::fs::create_dir_all(&base_folder)
        .with_context(|| format!("Creating base folder {:?} failed", base_folder))?;

    // Ctrl-C stops in-flight chunk fetches and prevents new posts from
    // starting; already-merged files stay intact.
    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, stopping");
            interrupt.cancel();
        }
    });

    let walker = ManifestWalker::new(reqwest::Client::new(), &config);
    let reports = walker.run(&manifest, &base_folder, &cancel).await;

    // A cancelled walk leaves posts unattempted and exits non-zero.
    let mut all_ok = reports.len() == manifest.posts.len();
    for report in &reports {
        if report.is_complete_success() {
            info!("Post {}: {} file(s) ok", report.post_id, report.files.len());
            continue;
        }

        all_ok = false;
        if let Some(err) = &report.setup_error {
            error!("Post {}: {}", report.post_id, err);
        }
        for file in &report.files {
            if let Err(err) = &file.result {
                error!("Post {}: {} ({}): {}", report.post_id, file.file_name, file.url, err);
            }
        }
    }

    Ok(all_ok)
}
