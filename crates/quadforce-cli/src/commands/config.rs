//! Config command implementation.

use anyhow::Result;

use crate::config::Config;

/// Print the effective configuration as pretty JSON.
pub fn show(config: &Config) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(())
}
