//! Line-oriented configuration files (category rules, unit names).
//!
//! Every file is looked up in the same order: an explicit path given on the
//! command line, then a default file in the working directory, then the copy
//! embedded in the binary. Blank lines and lines starting with `#` are ignored.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use std::time::Instant;
use tracing::{info, warn};

/// A configuration file the tool knows how to find and initialize.
#[derive(Debug, Clone, Copy)]
pub struct ConfigFile {
    /// Name of the file looked up in the working directory.
    pub file_name: &'static str,
    /// Used as the `component` field in log events.
    pub component: &'static str,
    pub embedded: &'static [u8],
}

pub fn config_lines(content: &str) -> impl Iterator<Item = (usize, &str)> {
    content
        .lines()
        .enumerate()
        .map(|(idx, line)| (idx + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
}

/// Load and parse every entry of `file`.
///
/// Parse failures are fatal for an explicitly requested file and only warned
/// about for the working-directory and embedded defaults.
pub fn load_entries<T, F>(file: &ConfigFile, explicit: Option<&Path>, parse: F) -> Result<Vec<T>>
where
    F: Fn(&str) -> Result<T>,
{
    let start_time = Instant::now();
    info!(action = "start", component = file.component, "Loading configuration");

    let mut entries = Vec::new();

    if let Some(path) = explicit {
        info!(action = "load", component = file.component, file_path = ?path, "Loading from specified file");
        if !path.exists() {
            anyhow::bail!("Configuration file not found: {:?}", path);
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file {:?}", path))?;
        for (line_num, line) in config_lines(&content) {
            let entry = parse(line)
                .with_context(|| format!("Invalid entry at {:?} line {}", path, line_num))?;
            entries.push(entry);
        }
    } else {
        let default_file = Path::new(file.file_name);
        let content = if default_file.exists() {
            info!(action = "load", component = file.component, file_path = ?default_file, "Loading from default file");
            fs::read_to_string(default_file)
                .with_context(|| format!("Failed to read configuration file {:?}", default_file))?
        } else {
            info!(action = "load", component = file.component, "Using embedded defaults");
            std::str::from_utf8(file.embedded)
                .context("Failed to decode embedded defaults")?
                .to_string()
        };

        for (line_num, line) in config_lines(&content) {
            match parse(line) {
                Ok(entry) => entries.push(entry),
                Err(e) => {
                    warn!(action = "parse", component = file.component, line_number = line_num, error = %e, "Skipping invalid entry")
                }
            }
        }
    }

    info!(
        action = "complete",
        component = file.component,
        entry_count = entries.len(),
        duration_ms = start_time.elapsed().as_millis(),
        "Configuration loaded"
    );
    Ok(entries)
}

/// Write the embedded defaults of `file` into `dir`, refusing to overwrite.
pub fn init_default(file: &ConfigFile, dir: &Path) -> Result<()> {
    let target = dir.join(file.file_name);

    if target.exists() {
        anyhow::bail!(
            "{} already exists. Remove it first if you want to reinitialize.",
            file.file_name
        );
    }

    let default_content =
        std::str::from_utf8(file.embedded).context("Failed to decode embedded defaults")?;

    fs::write(&target, default_content)
        .with_context(|| format!("Failed to write {:?}", target))?;
    println!("Created {} with default entries", file.file_name);

    Ok(())
}
