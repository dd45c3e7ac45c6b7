//! Inspect and manually set delays.

use anyhow::Result;

use oss_core::apply::set_source_delay;
use oss_core::config::Settings;
use oss_core::format::format_ms;
use oss_core::obs::ObsClient;
use oss_core::sources::collect_sources;

use crate::output;

/// Print the delays currently applied in OBS.
pub async fn show(client: &ObsClient, settings: &Settings) -> Result<()> {
    let sources = collect_sources(client, &settings.obs).await?;
    if sources.is_empty() {
        println!(
            "No feeds found in scene '{}'.",
            settings.obs.sources_scene
        );
        return Ok(());
    }

    for source in &sources {
        println!("{} {}", output::indicator(source), output::feed_name(source));
        println!(
            "- Audio set at {} delay offset",
            output::delay_colored(source.audio_delay)
        );
        println!(
            "- Video set at {} delay offset",
            output::delay_colored(source.video_delay)
        );
    }
    Ok(())
}

/// Prompt for a delay per active feed and apply each entry.
pub async fn set_interactive(client: &ObsClient, settings: &Settings) -> Result<()> {
    let sources = collect_sources(client, &settings.obs).await?;

    for source in sources.iter().filter(|s| s.active) {
        let prompt = format!(
            "For {}, type a value between 0 and {}",
            source.name,
            output::MAX_DELAY_MS as i64
        );
        let current = format!("{}", source.video_delay.round() as i64);
        let raw = output::prompt_line(&prompt, &current)?;

        let new_delay = match parse_delay(&raw) {
            Ok(value) => value,
            Err(message) => {
                eprintln!("{message}");
                continue;
            }
        };
        if new_delay as f64 == source.video_delay {
            println!("Skipping setting the new value...");
            continue;
        }

        match set_source_delay(client, source, new_delay).await {
            Ok(applied) => {
                println!(
                    "- Set delay: {} -> {}",
                    format_ms(applied.previous_video_ms),
                    format_ms(new_delay as f64)
                );
            }
            Err(e) => eprintln!("Failed to set delay on {}: {e}", source.name),
        }
        println!();
    }
    Ok(())
}

fn parse_delay(raw: &str) -> Result<i64, String> {
    let value: f64 = raw
        .trim()
        .parse()
        .map_err(|_| "You didn't input a number!".to_string())?;
    if value < 0.0 {
        Err("Number too small!".to_string())
    } else if value > output::MAX_DELAY_MS {
        Err("Number too big!".to_string())
    } else {
        Ok(value.round() as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_delay_accepts_range_and_rounds() {
        assert_eq!(parse_delay("1500"), Ok(1500));
        assert_eq!(parse_delay("1500.6"), Ok(1501));
        assert_eq!(parse_delay("0"), Ok(0));
        assert_eq!(parse_delay("20000"), Ok(20000));
    }

    #[test]
    fn parse_delay_rejects_bad_input() {
        assert!(parse_delay("abc").is_err());
        assert!(parse_delay("-1").is_err());
        assert!(parse_delay("20001").is_err());
    }
}
