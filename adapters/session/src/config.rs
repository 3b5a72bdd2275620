//! Loading of simulation parameters from TOML files.

use std::{fs, path::Path};

use anyhow::{bail, Context, Result};
use turfcash_core::SimulationConfig;

/// Reads and validates a simulation config from the TOML file at `path`.
pub fn load_config(path: impl AsRef<Path>) -> Result<SimulationConfig> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read simulation config from {}", path.display()))?;
    parse_config(&contents)
        .with_context(|| format!("failed to load simulation config from {}", path.display()))
}

/// Parses and validates a simulation config from TOML contents.
///
/// Missing fields keep their default values.
pub fn parse_config(contents: &str) -> Result<SimulationConfig> {
    let config: SimulationConfig =
        toml::from_str(contents).context("failed to parse simulation config toml contents")?;
    if let Err(error) = config.validate() {
        bail!("invalid simulation config: {error}");
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn empty_file_yields_defaults() {
        let config = parse_config("").expect("empty config is valid");
        assert_eq!(config, SimulationConfig::default());
    }

    #[test]
    fn partial_file_overrides_named_fields() {
        let config = parse_config(
            "loot_percentage = 0.5\nattack_ttl = 30\nincome_interval = 0.5\nnearby_cell_radius = 1\n",
        )
        .expect("partial config is valid");

        assert_eq!(config.loot_percentage, 0.5);
        assert_eq!(config.attack_ttl, Duration::from_secs(30));
        assert_eq!(config.income_interval, Duration::from_millis(500));
        assert_eq!(config.nearby_cell_radius, 1);
        assert_eq!(config.starting_wallet, 100.0);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let error = parse_config("loot_percentage = 1.5").expect_err("loot above one");
        assert!(error.to_string().contains("loot_percentage"), "{error}");

        let error = parse_config("combat_interval = 0").expect_err("zero interval");
        assert!(error.to_string().contains("combat_interval"), "{error}");

        let error = parse_config("nearby_cell_radius = 4000000000").expect_err("huge radius");
        assert!(error.to_string().contains("nearby_cell_radius"), "{error}");
    }

    #[test]
    fn malformed_toml_is_reported() {
        let error = parse_config("hex_size = ").expect_err("truncated toml");
        assert!(error.to_string().contains("failed to parse"), "{error}");
    }

    #[test]
    fn missing_file_names_the_path() {
        let error = load_config("/nonexistent/turfcash.toml").expect_err("missing file");
        assert!(format!("{error:#}").contains("/nonexistent/turfcash.toml"), "{error:#}");
    }
}
