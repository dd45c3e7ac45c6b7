//! Screenshot capture with latency measurement.
//!
//! Serial mode issues one `GetSourceScreenshot` per active feed and records
//! the wall-clock time elapsed when each capture completed; that latency
//! feeds the engine's compensation pass. Batch mode sends one request batch
//! and records the whole batch's duration on every captured feed (a uniform
//! latency cancels out of the engine's pairwise differences).

use tokio::time::Instant;
use tracing::{debug, warn};

use crate::config::{CaptureMode, ImageSettings};
use crate::models::SourceState;
use crate::obs::{ExecutionType, ObsClient, ObsError, Request};

/// One captured frame, still base64-encoded as received from OBS.
#[derive(Debug, Clone)]
pub struct CapturedFrame {
    pub name: String,
    pub image_data: String,
}

/// Capture a screenshot of every active feed, recording capture latency
/// into each feed's [`SourceState::screenshot_delay`].
///
/// Per-feed failures are logged and yield no frame for that feed; they
/// never abort the run.
pub async fn capture_screenshots(
    client: &ObsClient,
    sources: &mut [SourceState],
    image: &ImageSettings,
) -> Result<Vec<CapturedFrame>, ObsError> {
    match image.capture_mode {
        CaptureMode::Serial => capture_serial(client, sources, image).await,
        CaptureMode::BatchRealtime => {
            capture_batch(client, sources, image, ExecutionType::SerialRealtime).await
        }
        CaptureMode::BatchFrame => {
            capture_batch(client, sources, image, ExecutionType::SerialFrame).await
        }
    }
}

async fn capture_serial(
    client: &ObsClient,
    sources: &mut [SourceState],
    image: &ImageSettings,
) -> Result<Vec<CapturedFrame>, ObsError> {
    let start = Instant::now();
    let mut frames = Vec::new();

    for source in sources.iter_mut().filter(|s| s.active) {
        let result = client
            .get_source_screenshot(
                &source.name,
                &image.format,
                image.fetch_width,
                image.fetch_height,
                Some(image.compression_quality),
            )
            .await;
        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
        match result {
            Ok(image_data) => {
                debug!("{} - took {elapsed_ms}ms to screenshot", source.name);
                source.screenshot_delay = Some(elapsed_ms);
                frames.push(CapturedFrame {
                    name: source.name.clone(),
                    image_data,
                });
            }
            Err(ObsError::RequestFailed {
                code, comment, ..
            }) => {
                warn!(
                    "screenshot of {} failed with code {code}: {comment}",
                    source.name
                );
            }
            Err(other) => return Err(other),
        }
    }

    Ok(frames)
}

async fn capture_batch(
    client: &ObsClient,
    sources: &mut [SourceState],
    image: &ImageSettings,
    execution_type: ExecutionType,
) -> Result<Vec<CapturedFrame>, ObsError> {
    let requests: Vec<Request> = sources
        .iter()
        .filter(|s| s.active)
        .map(|source| {
            Request::new("GetSourceScreenshot", source.name.clone()).with_data(
                serde_json::json!({
                    "sourceName": source.name,
                    "imageFormat": image.format,
                    "imageWidth": image.fetch_width,
                    "imageHeight": image.fetch_height,
                }),
            )
        })
        .collect();

    let start = Instant::now();
    let results = client.call_batch(requests, execution_type, false).await?;
    let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
    debug!("took {elapsed_ms}ms to screenshot");

    let mut frames = Vec::new();
    for result in results {
        if !result.request_status.result {
            warn!(
                "screenshot of {} failed with code {}: {}",
                result.request_id,
                result.request_status.code,
                result.request_status.comment.unwrap_or_default()
            );
            continue;
        }
        let image_data = result
            .response_data
            .as_ref()
            .and_then(|d| d.get("imageData"))
            .and_then(serde_json::Value::as_str)
            .unwrap_or_default()
            .to_string();
        if let Some(source) = sources.iter_mut().find(|s| s.name == result.request_id) {
            source.screenshot_delay = Some(elapsed_ms);
        }
        frames.push(CapturedFrame {
            name: result.request_id,
            image_data,
        });
    }

    Ok(frames)
}
