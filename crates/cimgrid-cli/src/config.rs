//! Conversion options read from TOML.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use cimgrid_cgmes::Config;

/// Options from `path`, or the defaults when no file is given.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    parse_config(&text).with_context(|| format!("parsing config {}", path.display()))
}

pub fn parse_config(text: &str) -> Result<Config> {
    Ok(toml::from_str(text)?)
}

pub fn default_config_toml() -> Result<String> {
    toml::to_string_pretty(&Config::default()).context("serializing default config")
}

#[cfg(test)]
mod tests {
    use super::*;
    use cimgrid_cgmes::config::{BoundaryMerge, ThreeWindingsShunt};

    #[test]
    fn test_partial_config() {
        let config = parse_config(
            r#"
            convert_sv_injections = false

            [three_windings]
            shunt = "split"

            [boundary]
            merge = "cascade"
            "#,
        )
        .unwrap();
        assert!(!config.convert_sv_injections);
        assert!(config.convert_control_areas);
        assert_eq!(config.three_windings.shunt, ThreeWindingsShunt::Split);
        assert_eq!(config.boundary.merge, BoundaryMerge::Cascade);
        assert!(config.boundary.compute_flows);
    }

    #[test]
    fn test_default_config_round_trip() {
        let text = default_config_toml().unwrap();
        assert!(text.contains("[two_windings]"));
        assert_eq!(parse_config(&text).unwrap(), Config::default());
    }

    #[test]
    fn test_unknown_variant_rejected() {
        assert!(parse_config("[boundary]\nmerge = \"sideways\"\n").is_err());
    }

    #[test]
    fn test_missing_file() {
        let err = load_config(Some(Path::new("/nonexistent/cimgrid.toml"))).unwrap_err();
        assert!(err.to_string().contains("reading config"));
    }
}
