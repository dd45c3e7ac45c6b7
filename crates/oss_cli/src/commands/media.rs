//! Media-source housekeeping: playback control and input settings.

use anyhow::Result;
use serde_json::json;

use oss_core::config::Settings;
use oss_core::obs::{
    ExecutionType, ObsClient, Request, MEDIA_ACTION_PAUSE, MEDIA_ACTION_PLAY,
};
use oss_core::sources::collect_sources;

/// Resume or pause playback on every feed via one request batch.
pub async fn playback(client: &ObsClient, settings: &Settings, play: bool) -> Result<()> {
    let sources = collect_sources(client, &settings.obs).await?;
    let action = if play {
        MEDIA_ACTION_PLAY
    } else {
        MEDIA_ACTION_PAUSE
    };

    let requests = sources
        .iter()
        .map(|source| {
            Request::new("TriggerMediaInputAction", source.name.clone()).with_data(json!({
                "inputName": source.name,
                "mediaAction": action,
            }))
        })
        .collect();
    let results = client
        .call_batch(requests, ExecutionType::SerialRealtime, false)
        .await?;

    let mut failures = 0;
    for result in &results {
        if !result.request_status.result {
            failures += 1;
            eprintln!(
                "For \"{}\": received code {}: {}",
                result.request_id,
                result.request_status.code,
                result.request_status.comment.clone().unwrap_or_default()
            );
        }
    }
    println!(
        "Sent {} to {} feed(s).",
        if play { "PLAY" } else { "PAUSE" },
        results.len() - failures
    );
    Ok(())
}

/// Flip a boolean input setting on every media-source feed.
///
/// Only `ffmpeg_source` inputs carry these settings; other kinds are
/// skipped.
pub async fn set_media_setting(
    client: &ObsClient,
    settings: &Settings,
    key: &str,
    enabled: bool,
) -> Result<()> {
    let sources = collect_sources(client, &settings.obs).await?;

    for source in &sources {
        let input = match client.get_input_settings(&source.name).await {
            Ok(input) => input,
            Err(e) => {
                eprintln!("Could not read settings of {}: {e}", source.name);
                continue;
            }
        };
        if input.input_kind != "ffmpeg_source" {
            continue;
        }

        match client
            .set_input_settings(&source.name, json!({ key: enabled }))
            .await
        {
            Ok(()) => println!("{}: {key} = {enabled}", source.name),
            Err(e) => eprintln!("Could not update {}: {e}", source.name),
        }
    }
    Ok(())
}
