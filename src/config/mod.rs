//! # Configuration Management Module
//!
//! Loads and validates the console's configuration: which server to
//! talk to, how chatty the logs are, how often the player list is
//! polled, where the catalog seed files live, and the operator's saved
//! teleport locations.
//!
//! ## Configuration File Format
//!
//! The native format is TOML:
//!
//! ```toml
//! [server]
//! host = "127.0.0.1"
//! port = 25575
//! password = "hunter2"
//!
//! [logging]
//! level = "info"
//!
//! [refresh]
//! interval_secs = 5
//!
//! [catalog]
//! data_dir = "./data"
//!
//! [locations]
//! village_square = "150 70 -45"
//! spawn = "0, 64, 0"
//! ```
//!
//! ## Flat Key/Value Schema
//!
//! Deployments that resolve configuration elsewhere can hand the core a
//! flat mapping instead via [`Config::from_map`]: keys `host`, `port`,
//! `password`, plus zero or more `location_<name>` keys. Either way a
//! `location` value is three numbers separated by whitespace or commas
//! (`~` keeps the player's current value on that axis), and `<name>`
//! becomes a human label by replacing separators with spaces and title
//! casing: `location_village_square` → `"Village Square"`.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::fs;

use crate::errors::AdminError;
use crate::matcher::Named;

/// Target server connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// RCON password. May be left empty; the CLI prompts for it.
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

/// Player-list polling cadence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshConfig {
    /// Seconds between `list` polls. Defaults to 5.
    #[serde(default = "default_refresh_interval")]
    pub interval_secs: u64,
}

fn default_refresh_interval() -> u64 {
    5
}

impl Default for RefreshConfig {
    fn default() -> Self {
        RefreshConfig {
            interval_secs: default_refresh_interval(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Directory holding `items.json`, `effects.json`, `enchantments.json`.
    pub data_dir: String,
}

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    #[serde(default)]
    pub refresh: RefreshConfig,
    pub catalog: CatalogConfig,
    /// Saved teleport destinations, keyed by their raw config name.
    /// Values are coordinate triples; see the module docs for syntax.
    #[serde(default)]
    pub locations: HashMap<String, String>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path, e))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {}: {}", path, e))?;

        Ok(config)
    }

    /// Create a default configuration file.
    pub async fn create_default(path: &str) -> Result<()> {
        let config = Config::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| anyhow!("Failed to serialize default config: {}", e))?;

        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write config file {}: {}", path, e))?;

        Ok(())
    }

    /// Build a configuration from an already-resolved flat mapping.
    ///
    /// Recognized keys: `host`, `port`, `password`, and any number of
    /// `location_<name>` entries. Everything else falls back to the
    /// defaults.
    pub fn from_map(map: &HashMap<String, String>) -> Result<Self, AdminError> {
        let mut config = Config::default();
        if let Some(host) = map.get("host") {
            config.server.host = host.clone();
        }
        if let Some(port) = map.get("port") {
            config.server.port = port.parse().map_err(|_| {
                AdminError::Validation(format!("invalid port value: {}", port))
            })?;
        }
        if let Some(password) = map.get("password") {
            config.server.password = password.clone();
        }
        for (key, value) in map {
            if let Some(name) = key.strip_prefix("location_") {
                config.locations.insert(name.to_string(), value.clone());
            }
        }
        Ok(config)
    }

    /// Parse the configured location entries into records, sorted by
    /// label so listings are deterministic.
    pub fn parse_locations(&self) -> Result<Vec<Location>, AdminError> {
        let mut out = Vec::with_capacity(self.locations.len());
        for (key, value) in &self.locations {
            out.push(Location::parse(key, value)?);
        }
        out.sort_by(|a, b| a.label.cmp(&b.label));
        Ok(out)
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 25575,
                password: String::new(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                file: None,
            },
            refresh: RefreshConfig::default(),
            catalog: CatalogConfig {
                data_dir: "./data".to_string(),
            },
            locations: HashMap::new(),
        }
    }
}

/// One coordinate axis of a saved location. `Keep` renders as the `~`
/// pass-through token (keep the player's current value on that axis).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Axis {
    Value(f64),
    Keep,
}

impl Axis {
    /// Render for the command grammar: integral values carry no trailing
    /// `.0`, so `150 70 -45` survives a parse/render round trip.
    pub fn render(&self) -> String {
        match self {
            Axis::Keep => "~".to_string(),
            Axis::Value(v) => {
                if v.fract() == 0.0 {
                    format!("{}", *v as i64)
                } else {
                    format!("{}", v)
                }
            }
        }
    }

    fn parse(token: &str) -> Result<Self, AdminError> {
        if token == "~" {
            return Ok(Axis::Keep);
        }
        token
            .parse::<f64>()
            .map(Axis::Value)
            .map_err(|_| AdminError::Validation(format!("invalid coordinate: {}", token)))
    }
}

/// A saved teleport destination, parsed once from configuration at
/// startup and immutable afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Location {
    /// Human label derived from the raw config key.
    pub label: String,
    pub x: Axis,
    pub y: Axis,
    pub z: Axis,
}

impl Location {
    /// Parse one `<name> = "<x> <y> <z>"` entry. Numbers may be
    /// separated by whitespace, commas, or both.
    pub fn parse(name: &str, value: &str) -> Result<Self, AdminError> {
        let tokens: Vec<&str> = value
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|t| !t.is_empty())
            .collect();
        if tokens.len() != 3 {
            return Err(AdminError::Validation(format!(
                "location {} needs exactly three coordinates, got {:?}",
                name, value
            )));
        }
        Ok(Location {
            label: label_from_key(name),
            x: Axis::parse(tokens[0])?,
            y: Axis::parse(tokens[1])?,
            z: Axis::parse(tokens[2])?,
        })
    }
}

impl Named for Location {
    fn display_name(&self) -> &str {
        &self.label
    }
}

/// Turn a raw config key into a display label: separators become
/// spaces, words get title casing. `village_square` → `Village Square`.
fn label_from_key(key: &str) -> String {
    key.split(|c: char| c == '_' || c == '-' || c.is_whitespace())
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_from_key() {
        assert_eq!(label_from_key("village_square"), "Village Square");
        assert_eq!(label_from_key("spawn"), "Spawn");
        assert_eq!(label_from_key("OLD-mine_entrance"), "Old Mine Entrance");
    }

    #[test]
    fn test_location_parse_whitespace_and_commas() {
        let a = Location::parse("village_square", "150 70 -45").unwrap();
        assert_eq!(a.label, "Village Square");
        assert_eq!(a.x, Axis::Value(150.0));
        assert_eq!(a.y, Axis::Value(70.0));
        assert_eq!(a.z, Axis::Value(-45.0));

        let b = Location::parse("spawn", "0, 64, 0").unwrap();
        assert_eq!(b.y, Axis::Value(64.0));

        let c = Location::parse("mixed", "1,2 3").unwrap();
        assert_eq!(c.z, Axis::Value(3.0));
    }

    #[test]
    fn test_location_parse_passthrough_axis() {
        let loc = Location::parse("drop", "100 ~ -20").unwrap();
        assert_eq!(loc.y, Axis::Keep);
        assert_eq!(loc.y.render(), "~");
    }

    #[test]
    fn test_location_parse_rejects_bad_syntax() {
        for bad in ["150 70", "150 70 -45 3", "a b c", ""] {
            assert!(matches!(
                Location::parse("x", bad),
                Err(AdminError::Validation(_))
            ));
        }
    }

    #[test]
    fn test_axis_render_drops_trailing_zero() {
        assert_eq!(Axis::Value(150.0).render(), "150");
        assert_eq!(Axis::Value(-45.0).render(), "-45");
        assert_eq!(Axis::Value(12.5).render(), "12.5");
    }

    #[test]
    fn test_from_map_flat_schema() {
        let mut map = HashMap::new();
        map.insert("host".to_string(), "10.0.0.4".to_string());
        map.insert("port".to_string(), "25566".to_string());
        map.insert("password".to_string(), "hunter2".to_string());
        map.insert(
            "location_village_square".to_string(),
            "150 70 -45".to_string(),
        );

        let config = Config::from_map(&map).unwrap();
        assert_eq!(config.server.host, "10.0.0.4");
        assert_eq!(config.server.port, 25566);
        let locations = config.parse_locations().unwrap();
        assert_eq!(locations.len(), 1);
        assert_eq!(locations[0].label, "Village Square");
    }

    #[test]
    fn test_from_map_rejects_bad_port() {
        let mut map = HashMap::new();
        map.insert("port".to_string(), "not-a-port".to_string());
        assert!(matches!(
            Config::from_map(&map),
            Err(AdminError::Validation(_))
        ));
    }

    #[test]
    fn test_default_roundtrips_through_toml() {
        let config = Config::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed.server.port, 25575);
        assert_eq!(parsed.refresh.interval_secs, 5);
    }
}
