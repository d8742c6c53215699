use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use cimgrid_cli::config::default_config_toml;

pub fn handle(out: Option<&Path>) -> Result<()> {
    let text = default_config_toml()?;
    match out {
        Some(path) => {
            fs::write(path, &text).with_context(|| format!("writing {}", path.display()))?;
            println!("Default configuration written to {}", path.display());
        }
        None => print!("{text}"),
    }
    Ok(())
}
