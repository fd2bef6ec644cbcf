//! One-shot mode: share a file, or everything read from stdin, as a single upload.

use std::path::Path;
use std::time::Instant;

use anyhow::Context;
use slackcat_channels::{Channel, Destination, FileUpload};
use slackcat_stream::LineSource;
use tracing::info;

/// Read a local file for upload. The name defaults to the file's base name.
pub async fn from_path(path: &Path, name: Option<String>) -> anyhow::Result<(String, Vec<u8>)> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("unable to read {}", path.display()))?;
    let name = name.unwrap_or_else(|| {
        path.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(timestamp_name)
    });
    Ok((name, bytes))
}

/// Drain a line source into one newline-terminated buffer. The name defaults
/// to the current unix timestamp.
pub async fn from_source(
    mut source: impl LineSource,
    name: Option<String>,
) -> (String, Vec<u8>) {
    let mut bytes = Vec::new();
    while let Some(line) = source.next_line().await {
        bytes.extend_from_slice(line.as_bytes());
        bytes.push(b'\n');
    }
    (name.unwrap_or_else(timestamp_name), bytes)
}

pub async fn share(
    channel: &dyn Channel,
    destination: &Destination,
    name: String,
    bytes: Vec<u8>,
    noop: bool,
) -> anyhow::Result<()> {
    if noop {
        info!("skipping upload of file {name} to {destination}");
        return Ok(());
    }

    let start = Instant::now();
    let file = FileUpload {
        channel_id: destination.id.clone(),
        title: name.clone(),
        file_name: name,
        bytes,
    };
    channel
        .upload(&file)
        .await
        .context("error uploading file to Slack")?;
    info!(
        bytes = file.bytes.len(),
        "file {} uploaded to {destination} ({:.3}s)",
        file.file_name,
        start.elapsed().as_secs_f64()
    );
    Ok(())
}

fn timestamp_name() -> String {
    chrono::Utc::now().timestamp().to_string()
}
