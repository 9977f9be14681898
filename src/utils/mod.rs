pub mod rate_limiter;
pub mod retry;

use anyhow::{Context, Result};
use std::{fs, path::Path};
use tracing::info;

use crate::models::common::Config;

pub fn load_config<P: AsRef<Path>>(file_name: P) -> Result<Config> {
    // Build the path to the config file
    let manifest_dir = env!("CARGO_MANIFEST_DIR").to_string();
    let config_path = Path::new(&manifest_dir).join(file_name);
    info!("Config path: {}", config_path.to_string_lossy());

    let contents = fs::read_to_string(config_path).context("failed to read config file")?;

    let mut config: Config =
        serde_yaml::from_str(&contents).context("failed to parse config YAML")?;

    // Chain name ends up in metric labels, keep it underscore-separated
    config.chain_name = config.chain_name.replace('-', "_");

    Ok(config)
}

pub(crate) fn strip_html(error: &str) -> String {
    // RPC gateways return HTML error pages on overload; keep only the
    // first line of text so logs stay readable
    if error.contains("<!doctype html>") || error.contains("<html>") {
        error
            .lines()
            .map(|line| line.trim())
            .find(|line| {
                !line.starts_with('<')
                    && !line.ends_with('>')
                    && !line.is_empty()
                    && *line != "html"
                    && *line != "body"
            })
            .unwrap_or(error)
            .to_string()
    } else {
        error.to_string()
    }
}
