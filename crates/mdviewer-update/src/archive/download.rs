use std::path::Path;
use std::time::Duration;

use futures_util::StreamExt;
use log::info;
use tokio::io::AsyncWriteExt;

use crate::channel::ProgressReporter;
use crate::error::FailureReason;
use crate::outcome::UpdateProgress;

/// Stream `url` into `dest`, reporting progress per chunk. Returns the number
/// of bytes written.
pub(crate) async fn download_file(
    client: &reqwest::Client,
    url: &str,
    dest: &Path,
    timeout: Duration,
    progress: &ProgressReporter,
) -> Result<u64, FailureReason> {
    let seconds = timeout.as_secs();
    let response = client
        .get(url)
        .timeout(timeout)
        .send()
        .await
        .map_err(|error| FailureReason::from_http("Download", seconds, &error))?;

    if !response.status().is_success() {
        return Err(FailureReason::HttpStatus {
            operation: "Download",
            status: response.status().as_u16(),
        });
    }

    let total = response.content_length().unwrap_or(0);
    let mut downloaded: u64 = 0;

    let mut file = tokio::fs::File::create(dest).await.map_err(|error| {
        FailureReason::io_with_path("failed to create download file", dest, &error)
    })?;

    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|error| FailureReason::from_http("Download", seconds, &error))?;
        file.write_all(&chunk).await.map_err(|error| {
            FailureReason::io_with_path("failed to write download data", dest, &error)
        })?;
        downloaded += chunk.len() as u64;
        progress
            .send(UpdateProgress::Downloading { downloaded, total })
            .await;
    }

    file.flush().await.map_err(|error| {
        FailureReason::io_with_path("failed to flush download file", dest, &error)
    })?;

    let written = tokio::fs::metadata(dest).await.map_or(0, |meta| meta.len());
    if downloaded == 0 || written == 0 {
        return Err(FailureReason::precondition(
            "Downloaded file is empty or missing",
        ));
    }

    info!("Download complete: {downloaded} bytes");
    Ok(downloaded)
}
