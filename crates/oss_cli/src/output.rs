//! Styled terminal output and small interactive prompts.

use std::io::{self, Write};

use console::style;

use oss_core::format::format_ms;
use oss_core::models::SourceState;

/// Delays above this will not be accepted by OBS.
pub const MAX_DELAY_MS: f64 = 20_000.0;

/// `[ACTIVE]` / `[HIDDEN]` marker for a feed.
pub fn indicator(source: &SourceState) -> String {
    if source.active {
        style("[ACTIVE]").green().to_string()
    } else {
        style("[HIDDEN]").dim().to_string()
    }
}

/// Render a feed name, dimmed when the feed is hidden.
pub fn feed_name(source: &SourceState) -> String {
    if source.active {
        source.name.clone()
    } else {
        style(&source.name).dim().to_string()
    }
}

/// Render a delay value, colored by how much delay is being added:
/// out-of-range values are flagged as unsyncable, large ones shade from
/// yellow to red.
pub fn delay_colored(ms: f64) -> String {
    let text = format_ms(ms);
    if !(0.0..=MAX_DELAY_MS).contains(&ms) {
        style(format!("{text} WILL NOT SYNC")).on_red().to_string()
    } else if ms > 15_000.0 {
        style(text).red().to_string()
    } else if ms > 8_000.0 {
        style(text).yellow().to_string()
    } else {
        text
    }
}

/// Ask a yes/no question on the terminal.
pub fn confirm(prompt: &str, default: bool) -> io::Result<bool> {
    let hint = if default { "Y/n" } else { "y/N" };
    print!("{prompt} [{hint}] ");
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(match line.trim().to_lowercase().as_str() {
        "" => default,
        "y" | "yes" => true,
        _ => false,
    })
}

/// Read one line with a visible default.
pub fn prompt_line(prompt: &str, default: &str) -> io::Result<String> {
    if default.is_empty() {
        print!("{prompt}: ");
    } else {
        print!("{prompt} [{default}]: ");
    }
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    let trimmed = line.trim();
    Ok(if trimmed.is_empty() {
        default.to_string()
    } else {
        trimmed.to_string()
    })
}

/// Read a password without echoing it.
pub fn prompt_password(prompt: &str) -> io::Result<String> {
    let term = console::Term::stderr();
    term.write_str(&format!("{prompt}: "))?;
    term.read_secure_line()
}
