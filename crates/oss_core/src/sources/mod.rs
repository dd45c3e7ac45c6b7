//! Feed discovery: build [`SourceState`] records from the mixer's current
//! state.
//!
//! Scene items of the configured scene are filtered to media inputs, then
//! hydrated with their audio sync offset, existing video-delay filter, and
//! visibility through request batches.

use std::cmp::Ordering;

use tracing::debug;

use crate::config::ObsSettings;
use crate::models::SourceState;
use crate::obs::{
    ExecutionType, ObsClient, ObsError, Request, RequestResponse, VIDEO_DELAY_FILTER_KIND,
};

/// Input kinds that are treated as synchronizable feeds.
const FEED_INPUT_KINDS: [&str; 2] = ["ffmpeg_source", "vlc_source"];

/// Enumerate the feeds of the configured scene with their current delay
/// state and visibility.
pub async fn collect_sources(
    client: &ObsClient,
    settings: &ObsSettings,
) -> Result<Vec<SourceState>, ObsError> {
    let items = client
        .get_scene_item_list(&settings.sources_scene)
        .await?;

    let mut names = Vec::new();
    for item in items {
        let kind = item.input_kind.as_deref().unwrap_or("");
        if FEED_INPUT_KINDS.contains(&kind) {
            names.push(item.source_name);
        } else {
            debug!("found scene item of type {kind:?}, ignoring");
        }
    }
    if names.is_empty() {
        return Ok(Vec::new());
    }

    // Audio sync offsets first: they seed one record per feed.
    let audio_requests = names
        .iter()
        .map(|name| {
            Request::new("GetInputAudioSyncOffset", name.clone())
                .with_data(serde_json::json!({ "inputName": name }))
        })
        .collect();
    let audio_results = client
        .call_batch(audio_requests, ExecutionType::SerialRealtime, false)
        .await?;

    let mut sources = Vec::with_capacity(audio_results.len());
    for result in audio_results {
        let data = require_success(result)?;
        sources.push(SourceState::new(
            data.request_id,
            data.response_data
                .as_ref()
                .and_then(|d| d.get("inputAudioSyncOffset"))
                .and_then(serde_json::Value::as_f64)
                .unwrap_or(0.0),
            0.0,
        ));
    }

    // Video delay comes from each feed's async delay filter, when present.
    let filter_requests = names
        .iter()
        .map(|name| {
            Request::new("GetSourceFilterList", name.clone())
                .with_data(serde_json::json!({ "sourceName": name }))
        })
        .collect();
    let filter_results = client
        .call_batch(filter_requests, ExecutionType::SerialRealtime, false)
        .await?;
    for result in filter_results {
        if !result.request_status.result {
            continue;
        }
        let Some(filters) = result
            .response_data
            .as_ref()
            .and_then(|d| d.get("filters"))
            .and_then(serde_json::Value::as_array)
        else {
            continue;
        };
        let Some(source) = sources.iter_mut().find(|s| s.name == result.request_id) else {
            continue;
        };
        for filter in filters {
            if filter.get("filterKind").and_then(serde_json::Value::as_str)
                != Some(VIDEO_DELAY_FILTER_KIND)
            {
                continue;
            }
            source.video_delay = filter
                .get("filterSettings")
                .and_then(|s| s.get("delay_ms"))
                .and_then(serde_json::Value::as_f64)
                .unwrap_or(0.0);
            source.video_filter_name = filter
                .get("filterName")
                .and_then(serde_json::Value::as_str)
                .map(str::to_string);
        }
    }

    // Visibility decides which feeds are captured and written back.
    let active_requests = sources
        .iter()
        .map(|source| {
            Request::new("GetSourceActive", source.name.clone())
                .with_data(serde_json::json!({ "sourceName": source.name }))
        })
        .collect();
    let active_results = client
        .call_batch(active_requests, ExecutionType::SerialRealtime, false)
        .await?;
    for result in active_results {
        let data = require_success(result)?;
        if let Some(source) = sources.iter_mut().find(|s| s.name == data.request_id) {
            source.active = data
                .response_data
                .as_ref()
                .and_then(|d| d.get("videoShowing"))
                .and_then(serde_json::Value::as_bool)
                .unwrap_or(false);
        }
    }

    if settings.natural_sort {
        sources.sort_by(|a, b| natural_cmp(&a.name, &b.name));
    }

    Ok(sources)
}

fn require_success(result: RequestResponse) -> Result<RequestResponse, ObsError> {
    if result.request_status.result {
        Ok(result)
    } else {
        Err(ObsError::RequestFailed {
            request_type: result.request_type,
            code: result.request_status.code,
            comment: result.request_status.comment.unwrap_or_default(),
        })
    }
}

/// Alphanumeric ordering: digit runs compare numerically, so "Feed 2" sorts
/// before "Feed 10".
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut a_chars = a.chars().peekable();
    let mut b_chars = b.chars().peekable();

    loop {
        match (a_chars.peek().copied(), b_chars.peek().copied()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) if x.is_ascii_digit() && y.is_ascii_digit() => {
                let a_num = take_number(&mut a_chars);
                let b_num = take_number(&mut b_chars);
                match a_num.cmp(&b_num) {
                    Ordering::Equal => {}
                    other => return other,
                }
            }
            (Some(x), Some(y)) => {
                match x.cmp(&y) {
                    Ordering::Equal => {
                        a_chars.next();
                        b_chars.next();
                    }
                    other => return other,
                }
            }
        }
    }
}

fn take_number(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> u64 {
    let mut value: u64 = 0;
    while let Some(ch) = chars.peek() {
        let Some(digit) = ch.to_digit(10) else { break };
        value = value.saturating_mul(10).saturating_add(digit as u64);
        chars.next();
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn natural_cmp_orders_digit_runs_numerically() {
        let mut names = vec!["Feed 10", "Feed 2", "Feed 1"];
        names.sort_by(|a, b| natural_cmp(a, b));
        assert_eq!(names, vec!["Feed 1", "Feed 2", "Feed 10"]);
    }

    #[test]
    fn natural_cmp_falls_back_to_lexicographic() {
        assert_eq!(natural_cmp("alpha", "beta"), Ordering::Less);
        assert_eq!(natural_cmp("alpha", "alpha"), Ordering::Equal);
        assert_eq!(natural_cmp("alpha 2", "alpha"), Ordering::Greater);
    }
}
