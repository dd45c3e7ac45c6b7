//! Aspect-ratio cropping of the current scene.

use anyhow::{bail, Result};

use oss_core::aspect::set_scene_crop;
use oss_core::obs::ObsClient;

pub async fn run(client: &ObsClient, ratio: &str) -> Result<()> {
    let target = parse_ratio(ratio)?;

    let changes = set_scene_crop(client, target).await?;
    if changes.is_empty() {
        println!("No sized scene items found to crop.");
        return Ok(());
    }
    for change in changes {
        if change.crop_bottom > 0 {
            println!(
                "Setting {} to {}:{} (cropBottom {})",
                change.source_name, target.0, target.1, change.crop_bottom
            );
        } else {
            println!(
                "Resetting {} to {}:{}",
                change.source_name, target.0, target.1
            );
        }
    }
    Ok(())
}

fn parse_ratio(ratio: &str) -> Result<(u32, u32)> {
    let Some((w, h)) = ratio.split_once(':') else {
        bail!("ratio must look like 16:9");
    };
    let (Ok(w), Ok(h)) = (w.trim().parse::<u32>(), h.trim().parse::<u32>()) else {
        bail!("ratio must look like 16:9");
    };
    if w == 0 || h == 0 {
        bail!("ratio sides must be non-zero");
    }
    Ok((w, h))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_common_ratios() {
        assert_eq!(parse_ratio("16:9").unwrap(), (16, 9));
        assert_eq!(parse_ratio("16:10").unwrap(), (16, 10));
    }

    #[test]
    fn rejects_malformed_ratios() {
        assert!(parse_ratio("16").is_err());
        assert!(parse_ratio("16:0").is_err());
        assert!(parse_ratio("a:b").is_err());
    }
}
