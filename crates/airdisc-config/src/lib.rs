//! Configuration for the discount ledger.
//!
//! TOML file + `AIRDISC_` environment overrides, layered with `figment`,
//! and translation to `airdisc_core::LedgerConfig`. The core crate never
//! touches disk; services embedding the ledger load a `Config` here and
//! hand the result in.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::TimeDelta;
use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use airdisc_core::LedgerConfig;
use airdisc_core::config::DEFAULT_REYKJAVIK_AIRPORT_CODES;

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub ledger: LedgerSection,
}

/// `[ledger]` table. Durations are humantime strings (`"24h"`, `"90m"`).
#[derive(Debug, Deserialize, Serialize)]
pub struct LedgerSection {
    #[serde(default = "default_entry_ttl")]
    pub entry_ttl: String,

    #[serde(default = "default_grace_period")]
    pub connecting_flight_grace_period: String,

    #[serde(default = "default_reykjavik_airport_codes")]
    pub reykjavik_airport_codes: Vec<String>,
}

impl Default for LedgerSection {
    fn default() -> Self {
        Self {
            entry_ttl: default_entry_ttl(),
            connecting_flight_grace_period: default_grace_period(),
            reykjavik_airport_codes: default_reykjavik_airport_codes(),
        }
    }
}

fn default_entry_ttl() -> String {
    "24h".into()
}
fn default_grace_period() -> String {
    "48h".into()
}
fn default_reykjavik_airport_codes() -> Vec<String> {
    DEFAULT_REYKJAVIK_AIRPORT_CODES
        .iter()
        .map(|code| (*code).to_owned())
        .collect()
}

impl Config {
    /// Validate and convert into the core's runtime configuration.
    pub fn to_ledger_config(&self) -> Result<LedgerConfig, ConfigError> {
        let ledger = &self.ledger;

        let entry_ttl = parse_duration("ledger.entry_ttl", &ledger.entry_ttl)?;
        if entry_ttl.is_zero() {
            return Err(ConfigError::Validation {
                field: "ledger.entry_ttl".into(),
                reason: "must be greater than zero".into(),
            });
        }

        let grace = parse_duration(
            "ledger.connecting_flight_grace_period",
            &ledger.connecting_flight_grace_period,
        )?;
        let connecting_flight_grace_period =
            TimeDelta::from_std(grace).map_err(|_| ConfigError::Validation {
                field: "ledger.connecting_flight_grace_period".into(),
                reason: format!("out of range: {}", ledger.connecting_flight_grace_period),
            })?;

        let reykjavik_airport_codes: Vec<String> = ledger
            .reykjavik_airport_codes
            .iter()
            .map(|code| code.trim().to_ascii_uppercase())
            .filter(|code| !code.is_empty())
            .collect();
        if reykjavik_airport_codes.is_empty() {
            return Err(ConfigError::Validation {
                field: "ledger.reykjavik_airport_codes".into(),
                reason: "at least one airport code is required".into(),
            });
        }

        Ok(LedgerConfig {
            entry_ttl,
            connecting_flight_grace_period,
            reykjavik_airport_codes,
        })
    }
}

fn parse_duration(field: &str, raw: &str) -> Result<Duration, ConfigError> {
    humantime::parse_duration(raw).map_err(|e| ConfigError::Validation {
        field: field.into(),
        reason: format!("'{raw}': {e}"),
    })
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("is", "airdisc", "airdisc").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("airdisc");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load from an explicit file, then apply `AIRDISC_` environment
/// overrides (`AIRDISC_LEDGER__ENTRY_TTL=12h`). A missing file is not an
/// error; defaults fill in.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("AIRDISC_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load the canonical config file + environment, validate, and convert.
pub fn load_ledger_config() -> Result<LedgerConfig, ConfigError> {
    load_config_from(&config_path())?.to_ledger_config()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write it to `path`.
pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// Tests that read the environment run inside `figment::Jail`, which
// serializes them and restores the environment afterwards.
#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use figment::Jail;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_match_core_defaults() {
        let ledger = Config::default().to_ledger_config().unwrap();
        assert_eq!(ledger, LedgerConfig::default());
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        Jail::expect_with(|jail| {
            let config = load_config_from(&jail.directory().join("absent.toml")).unwrap();
            assert_eq!(config.ledger.entry_ttl, "24h");
            assert_eq!(config.ledger.reykjavik_airport_codes, vec!["RKV", "REK"]);
            Ok(())
        });
    }

    #[test]
    fn file_values_override_defaults() {
        Jail::expect_with(|jail| {
            let path = jail.directory().join("config.toml");
            std::fs::write(
                &path,
                "[ledger]\nentry_ttl = \"12h\"\nconnecting_flight_grace_period = \"36h\"\n",
            )
            .unwrap();

            let ledger = load_config_from(&path).unwrap().to_ledger_config().unwrap();
            assert_eq!(ledger.entry_ttl, Duration::from_secs(12 * 60 * 60));
            assert_eq!(ledger.connecting_flight_grace_period, TimeDelta::hours(36));
            assert_eq!(ledger.reykjavik_airport_codes, vec!["RKV", "REK"]);
            Ok(())
        });
    }

    #[test]
    fn environment_overrides_file() {
        Jail::expect_with(|jail| {
            let path = jail.directory().join("config.toml");
            std::fs::write(&path, "[ledger]\nentry_ttl = \"12h\"\n").unwrap();
            jail.set_env("AIRDISC_LEDGER__ENTRY_TTL", "90m");

            let ledger = load_config_from(&path).unwrap().to_ledger_config().unwrap();
            assert_eq!(ledger.entry_ttl, Duration::from_secs(90 * 60));
            Ok(())
        });
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn ledger_config_loads_from_the_platform_path() {
        Jail::expect_with(|jail| {
            let root = jail.directory().to_path_buf();
            jail.set_env("XDG_CONFIG_HOME", root.display());
            let dir = root.join("airdisc");
            std::fs::create_dir_all(&dir).unwrap();
            std::fs::write(
                dir.join("config.toml"),
                "[ledger]\nconnecting_flight_grace_period = \"6h\"\n",
            )
            .unwrap();
            jail.set_env("AIRDISC_LEDGER__ENTRY_TTL", "2h");

            assert_eq!(config_path(), dir.join("config.toml"));
            let ledger = load_ledger_config().unwrap();
            assert_eq!(ledger.entry_ttl, Duration::from_secs(2 * 60 * 60));
            assert_eq!(ledger.connecting_flight_grace_period, TimeDelta::hours(6));
            Ok(())
        });
    }

    #[test]
    fn invalid_environment_value_fails_validation() {
        Jail::expect_with(|jail| {
            jail.set_env("AIRDISC_LEDGER__ENTRY_TTL", "soon");
            let path = jail.directory().join("config.toml");

            let err = load_config_from(&path)
                .unwrap()
                .to_ledger_config()
                .unwrap_err();
            assert!(
                matches!(err, ConfigError::Validation { ref field, .. } if field == "ledger.entry_ttl"),
                "unexpected error: {err}"
            );
            Ok(())
        });
    }

    #[test]
    fn airport_codes_are_normalized() {
        let config = Config {
            ledger: LedgerSection {
                reykjavik_airport_codes: vec![" rkv ".into(), String::new()],
                ..LedgerSection::default()
            },
        };
        let ledger = config.to_ledger_config().unwrap();
        assert_eq!(ledger.reykjavik_airport_codes, vec!["RKV"]);
    }

    #[test]
    fn rejects_unparseable_duration() {
        let config = Config {
            ledger: LedgerSection {
                entry_ttl: "one day".into(),
                ..LedgerSection::default()
            },
        };
        let err = config.to_ledger_config().unwrap_err();
        assert!(
            matches!(err, ConfigError::Validation { ref field, .. } if field == "ledger.entry_ttl"),
            "unexpected error: {err}"
        );
    }

    #[test]
    fn rejects_zero_ttl_and_empty_airports() {
        let zero = Config {
            ledger: LedgerSection {
                entry_ttl: "0s".into(),
                ..LedgerSection::default()
            },
        };
        assert!(zero.to_ledger_config().is_err());

        let no_airports = Config {
            ledger: LedgerSection {
                reykjavik_airport_codes: Vec::new(),
                ..LedgerSection::default()
            },
        };
        assert!(no_airports.to_ledger_config().is_err());
    }

    #[test]
    fn saved_config_loads_back() {
        Jail::expect_with(|jail| {
            let path = jail.directory().join("nested").join("config.toml");
            let config = Config {
                ledger: LedgerSection {
                    entry_ttl: "6h".into(),
                    ..LedgerSection::default()
                },
            };

            save_config_to(&config, &path).unwrap();
            let loaded = load_config_from(&path).unwrap();
            assert_eq!(loaded.ledger.entry_ttl, "6h");
            Ok(())
        });
    }
}
