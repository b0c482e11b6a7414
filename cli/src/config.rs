use std::path::Path;

use engine::Validatable;
use serde::Deserialize;
use tools::toml;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub solana: solana::Config,
    pub general: GeneralConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GeneralConfig {
    pub server_addr: String,
    pub metrics_addr: String,
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let mut config: Self = toml::parse_file(path)?;
        config.solana.validate()?;
        Ok(config)
    }
}
