//! File sharing via Slack's external upload flow:
//! `files.getUploadURLExternal` -> POST bytes -> `files.completeUploadExternal`.

use serde::Deserialize;
use slackcat_channels::{ChannelError, FileUpload};
use tracing::{debug, warn};

use crate::client::{http_error, SlackClient};

#[derive(Debug, Deserialize)]
struct UploadTicket {
    upload_url: String,
    file_id: String,
}

#[derive(Debug, Deserialize)]
struct CompletedUpload {
    #[serde(default)]
    files: Vec<serde_json::Value>,
}

pub async fn upload_file(client: &SlackClient, file: &FileUpload) -> Result<(), ChannelError> {
    if file.bytes.is_empty() {
        return Err(ChannelError::SendFailed(format!(
            "refusing to upload empty file {}",
            file.file_name
        )));
    }

    let length = file.bytes.len().to_string();
    let ticket: UploadTicket = client
        .post_form(
            "files.getUploadURLExternal",
            &[("filename", file.file_name.as_str()), ("length", length.as_str())],
        )
        .await?;
    debug!(file_id = %ticket.file_id, bytes = file.bytes.len(), "upload ticket issued");

    let part = reqwest::multipart::Part::bytes(file.bytes.clone()).file_name(file.file_name.clone());
    let form = reqwest::multipart::Form::new().part("file", part);
    let resp = client
        .http()
        .post(&ticket.upload_url)
        .multipart(form)
        .send()
        .await
        .map_err(http_error)?;

    if !resp.status().is_success() {
        let status = resp.status().as_u16();
        let text = resp.text().await.unwrap_or_default();
        warn!(status, body = %text, "file byte upload rejected");
        return Err(ChannelError::SendFailed(format!(
            "upload of {} failed: HTTP {status}",
            file.file_name
        )));
    }

    let completed: CompletedUpload = client
        .post_json(
            "files.completeUploadExternal",
            &complete_body(&ticket.file_id, file),
        )
        .await?;
    debug!(files = completed.files.len(), "upload completed");
    Ok(())
}

fn complete_body(file_id: &str, file: &FileUpload) -> serde_json::Value {
    serde_json::json!({
        "files": [{ "id": file_id, "title": file.title }],
        "channel_id": file.channel_id,
    })
}
