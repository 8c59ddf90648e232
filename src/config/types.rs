use figment::providers::{Env, Format, Yaml};
use figment::Figment;
use schemars::{schema_for, JsonSchema};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::logging::LoggingConfig;
use super::metrics::MetricsConfig;

/// Environment variable naming an alternative config file.
pub const CONFIG_PATH_ENV: &str = "METROTRON_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "./config.yaml";
/// Prefix of environment overrides, e.g. `METROTRON_METRICS__API_KEY`.
const ENV_PREFIX: &str = "METROTRON_";

/// A top-level enum for versioned configurations.
#[derive(Deserialize, Serialize, JsonSchema)]
#[serde(tag = "version")]
pub enum Config {
    #[serde(rename = "1.0.0")]
    ConfigV1(ConfigV1),
}

/// Main config for v1.0.0.
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
pub struct ConfigV1 {
    pub bind_address: String,
    pub logging: LoggingConfig,
    pub metrics: MetricsConfig,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Invalid(#[from] Box<figment::Error>),
}

/// Config file (default `./config.yaml`) overlaid with `METROTRON_*` environment variables.
pub fn figment() -> Figment {
    let path =
        std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    Figment::new().merge(Yaml::file(path)).merge(
        Env::prefixed(ENV_PREFIX)
            .ignore(&["config"])
            .split("__"),
    )
}

/// Extracts a versioned config from any figment.
pub fn load_config_from(figment: Figment) -> Result<ConfigV1, ConfigError> {
    let config = figment.extract::<Config>().map_err(Box::new)?;
    match config {
        Config::ConfigV1(c) => Ok(c),
    }
}

/// Load the config, exiting the process when it is missing or invalid.
pub fn load_config() -> ConfigV1 {
    match load_config_from(figment()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {}", e);
            std::process::exit(1);
        }
    }
}

/// Print the JSON schema for the configuration to stdout.
pub fn print_schema() {
    let schema = schema_for!(Config);
    match serde_json::to_string_pretty(&schema) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error rendering schema: {}", e),
    }
}
