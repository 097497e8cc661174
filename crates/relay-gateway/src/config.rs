//! Gateway configuration: defaults, then an optional TOML file, then `RELAY__*` env vars.

use serde::Deserialize;

/// Instance registered with the loopback service at startup.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InstanceSeed {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
    /// Include the rendered error chain (`stack`) in 500 bodies.
    pub expose_diagnostics: bool,
    #[serde(default)]
    pub instances: Vec<InstanceSeed>,
}

impl GatewayConfig {
    /// Load config. Precedence: env `RELAY__*` > file at `RELAY_CONFIG` (default `config/relay`) > defaults.
    pub fn load() -> Result<Self, config::ConfigError> {
        let path = std::env::var("RELAY_CONFIG").unwrap_or_else(|_| "config/relay".to_string());
        Self::load_from(&path)
    }

    pub fn load_from(path: &str) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .set_default("host", "127.0.0.1")?
            .set_default("port", 8000_i64)?
            .set_default("expose_diagnostics", true)?
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix("RELAY")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
