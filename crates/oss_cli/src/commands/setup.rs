//! First-run configuration.

use anyhow::Result;
use console::style;

use oss_core::config::{ConfigManager, ConfigSection};

use crate::output;

pub fn run(config: &mut ConfigManager) -> Result<()> {
    println!("Let's configure obs-stream-sync!");
    println!("If you haven't set up the WebSocket server before:");
    println!();
    println!(
        "1. Launch OBS, and select {}.",
        style("Tools > WebSocket Server Settings").bold()
    );
    println!(
        "2. Then, {} under Plugin Settings.",
        style("Enable the WebSocket server").bold()
    );
    println!("3. Next, select Show Connect Info and copy the Server Password in here.");
    println!();
    println!("If you're running this on the same computer as OBS, use the defaults.");
    println!();

    loop {
        let url = output::prompt_line(
            "Enter your OBS WebSocket URL",
            &config.settings().obs.server_url,
        )?;
        let password = output::prompt_password(
            "Enter your OBS WebSocket Server Password (empty if passwordless)",
        )?;
        let scene = output::prompt_line(
            "Scene that holds the feeds to synchronize",
            &config.settings().obs.sources_scene,
        )?;

        println!(
            "Your configuration will be saved to {}.",
            style(config.path().display()).underlined()
        );
        if !output::confirm("Are you sure you want to save?", true)? {
            continue;
        }

        let obs = &mut config.settings_mut().obs;
        obs.server_url = url.trim().to_string();
        obs.server_password = password;
        obs.sources_scene = scene;
        config.update_section(ConfigSection::Obs)?;

        println!("Set! You can edit these in {}.", config.path().display());
        return Ok(());
    }
}
