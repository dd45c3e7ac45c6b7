//! The sync and reset commands.

use anyhow::Result;
use console::style;

use oss_core::apply::{apply_delays, plan_reset, plan_sync_delays};
use oss_core::config::Settings;
use oss_core::cycle::{run_sync_cycle, CycleError, SyncCycle};
use oss_core::decode::QrTimestampDecoder;
use oss_core::format::{format_ms, ms_to_timestamp};
use oss_core::models::{SourceState, SyncedTimestamp};
use oss_core::obs::ObsClient;
use oss_core::snapshot::save_screenshots;
use oss_core::sources::collect_sources;
use oss_core::sync::SyncError;

use crate::output;

/// Capture, report, confirm, apply.
pub async fn run(
    client: &ObsClient,
    settings: &Settings,
    sync_to: Option<&str>,
    only: &[String],
    now: bool,
) -> Result<()> {
    let decoder = QrTimestampDecoder;
    let only = (!only.is_empty()).then_some(only);

    let cycle = match run_sync_cycle(client, settings, &decoder, sync_to, only).await {
        Ok(cycle) => cycle,
        Err(CycleError::Sync(SyncError::NoValidInput)) => {
            println!("No timestamps found in any of the screenshots!");
            return Ok(());
        }
        Err(other) => return Err(other.into()),
    };

    if !now {
        print_report(&cycle);

        if settings.image.save_screenshots
            && output::confirm("Save screenshots to ./screenshots?", false)?
        {
            save_and_report(&cycle, settings);
        }

        println!();
        if !output::confirm("Sync feeds with the delays above?", false)? {
            return Ok(());
        }
    }

    let plan = plan_sync_delays(&cycle.sources, &cycle.synced);
    if now {
        for (name, delay_ms) in &plan {
            let Some(entry) = cycle.synced.iter().find(|t| &t.name == name) else {
                continue;
            };
            println!(
                "{} - {} - {} = {}",
                name,
                ms_to_timestamp(entry.ms),
                format_ms(*delay_ms as f64),
                ms_to_timestamp(entry.ms - *delay_ms as f64)
            );
        }
    }
    apply_and_report(client, &cycle.sources, &plan, "Set").await;
    Ok(())
}

/// Zero every active feed's delays.
pub async fn reset(client: &ObsClient, settings: &Settings) -> Result<()> {
    let sources = collect_sources(client, &settings.obs).await?;
    let plan = plan_reset(&sources);
    if plan.is_empty() {
        println!("No active feeds to reset.");
        return Ok(());
    }
    apply_and_report(client, &sources, &plan, "Reset").await;
    Ok(())
}

/// Per-feed report mirroring what a sync would apply.
fn print_report(cycle: &SyncCycle) {
    for source in &cycle.sources {
        let Some(entry) = cycle.synced.iter().find(|t| t.name == source.name) else {
            if source.active {
                println!(
                    "{} {}: no screenshot was captured",
                    output::indicator(source),
                    output::feed_name(source)
                );
            }
            continue;
        };

        if !entry.is_valid() {
            if source.active {
                println!(
                    "{} {}: no timestamp found",
                    output::indicator(source),
                    output::feed_name(source)
                );
            }
            continue;
        }

        println!("{} {}", output::indicator(source), output::feed_name(source));
        print_entry_lines(source, entry);
    }
}

fn print_entry_lines(source: &SourceState, entry: &SyncedTimestamp) {
    if entry.screenshot_delay_ms > 0.0 {
        println!("- Screenshot delay: {}", format_ms(entry.screenshot_delay_ms));
    }
    println!("- Timestamp: {}", format_ms(entry.ms));
    if let Some(visual) = entry.visual_offset_ms {
        println!("- Visual offset: {}", format_ms(visual));
    }
    if let Some(offset) = entry.offset_ms {
        println!(
            "- Would apply: {} -> {}",
            format_ms(source.video_delay),
            output::delay_colored(offset)
        );
    }
}

fn save_and_report(cycle: &SyncCycle, settings: &Settings) {
    let outcomes = save_screenshots(
        &cycle.frames,
        &settings.image,
        std::path::Path::new("screenshots"),
        chrono::Local::now(),
    );
    for (name, outcome) in outcomes {
        match outcome {
            Ok(path) => println!("Saved screenshot of {name} to {}", style(path.display()).underlined()),
            Err(e) => eprintln!("Could not save screenshot of {name}: {e}"),
        }
    }
}

async fn apply_and_report(
    client: &ObsClient,
    sources: &[SourceState],
    plan: &[(String, i64)],
    verb: &str,
) {
    let outcomes = apply_delays(client, sources, plan).await;
    for outcome in outcomes {
        match outcome {
            Ok(applied) => {
                let new_delay = format_ms(applied.delay_ms as f64);
                println!("{}", applied.name);
                println!(
                    "- {verb} audio sync offset: {} -> {new_delay}",
                    format_ms(applied.previous_audio_ms)
                );
                println!(
                    "- {verb} video delay offset: {} -> {new_delay}",
                    format_ms(applied.previous_video_ms)
                );
            }
            Err((name, e)) => eprintln!("Failed to set delay on {name}: {e}"),
        }
    }
}
