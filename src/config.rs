use crate::error::{AppError, Result};
use serde::{Deserialize, Deserializer};
use std::path::{Path, PathBuf};

/// Environment variable that overrides the default config file location
pub const CONFIG_PATH_ENV: &str = "AQI_DASHBOARD_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "config/config.yaml";

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub sources: SourceConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub columns: ColumnConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SourceConfig {
    pub historical: PathBuf,
    pub forecast: PathBuf,
    pub aqi: PathBuf,
    pub stylesheet: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port", deserialize_with = "deserialize_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Historical column names charted by the temperature and humidity views
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ColumnConfig {
    #[serde(default = "default_temperature_column")]
    pub temperature: String,
    #[serde(default = "default_humidity_column")]
    pub humidity: String,
}

impl Default for ColumnConfig {
    fn default() -> Self {
        Self {
            temperature: default_temperature_column(),
            humidity: default_humidity_column(),
        }
    }
}

fn default_temperature_column() -> String {
    "temp".to_string()
}

fn default_humidity_column() -> String {
    "humidity".to_string()
}

/// Custom deserializer that handles port as both number and string
///
/// Accepts:
/// - `port: 8080` (number)
/// - `port: "8080"` (string that parses to number)
/// - `port: ${PORT}` (env var substituted to either)
fn deserialize_port<'de, D>(deserializer: D) -> std::result::Result<u16, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum PortValue {
        Number(u16),
        String(String),
    }

    match PortValue::deserialize(deserializer)? {
        PortValue::Number(n) => Ok(n),
        PortValue::String(s) => s
            .parse::<u16>()
            .map_err(|_| serde::de::Error::custom(format!("Invalid port number: '{}'", s))),
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| AppError::Config(format!("Failed to read config file: {}", e)))?;

        Self::from_yaml(&content)
    }

    /// Parse configuration text, expanding `${VAR}` references first
    pub fn from_yaml(content: &str) -> Result<Self> {
        let expanded = expand_env_vars(content)?;

        let config: Config = serde_yaml::from_str(&expanded)
            .map_err(|e| AppError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let paths = [
            ("sources.historical", &self.sources.historical),
            ("sources.forecast", &self.sources.forecast),
            ("sources.aqi", &self.sources.aqi),
            ("sources.stylesheet", &self.sources.stylesheet),
        ];

        for (field_name, path) in &paths {
            let text = path.to_string_lossy();
            if text.trim().is_empty() {
                return Err(AppError::Config(format!("{} cannot be empty", field_name)));
            }
            if text.contains("${") {
                return Err(AppError::Config(format!(
                    "{} contains an unexpanded environment variable: {}",
                    field_name, text
                )));
            }
        }

        if self.server.host.is_empty() {
            return Err(AppError::Config("Server host cannot be empty".to_string()));
        }

        // u16 max is 65535, so no upper bound check needed
        if self.server.port == 0 {
            return Err(AppError::Config("Server port cannot be 0".to_string()));
        }

        if self.columns.temperature.trim().is_empty() || self.columns.humidity.trim().is_empty() {
            return Err(AppError::Config(
                "Chart column names cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

fn expand_env_vars(content: &str) -> Result<String> {
    let mut result = content.to_string();
    let re = regex_lite::Regex::new(r"\$\{([^}]+)\}")
        .map_err(|e| AppError::Config(format!("Invalid env var pattern: {}", e)))?;

    let mut missing_vars = Vec::new();

    for cap in re.captures_iter(content) {
        let var_name = &cap[1];
        match std::env::var(var_name) {
            Ok(value) => {
                result = result.replace(&cap[0], &value);
            }
            Err(_) => {
                if !missing_vars.iter().any(|v| v == var_name) {
                    missing_vars.push(var_name.to_string());
                }
            }
        }
    }

    if !missing_vars.is_empty() {
        return Err(AppError::Config(format!(
            "Missing required environment variable{}: {}\n\n\
             To fix this:\n\
             1. Create a .env file in the project root (copy .env.example)\n\
             2. Set the missing variable{}: export {}=<value>",
            if missing_vars.len() > 1 { "s" } else { "" },
            missing_vars.join(", "),
            if missing_vars.len() > 1 { "s" } else { "" },
            missing_vars[0],
        )));
    }

    Ok(result)
}
