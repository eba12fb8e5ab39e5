use super::{gp::GpConfig, trading::TradingConfig, traits::ConfigSection};
use crate::error::TradevolveError;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub gp: GpConfig,
    #[serde(default)]
    pub trading: TradingConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), TradevolveError> {
        self.gp.validate()?;
        self.trading.validate()?;
        Ok(())
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, TradevolveError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| TradevolveError::Configuration(format!("Failed to read config: {}", e)))?;

        let config: AppConfig = toml::from_str(&contents)
            .map_err(|e| TradevolveError::Configuration(format!("Failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), TradevolveError> {
        let toml_str = toml::to_string_pretty(self)
            .map_err(|e| TradevolveError::Configuration(format!("Failed to serialize: {}", e)))?;

        std::fs::write(path, toml_str)
            .map_err(|e| TradevolveError::Configuration(format!("Failed to write config: {}", e)))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_toml() {
        let config = AppConfig::default();
        let path = std::env::temp_dir().join(format!("tradevolve_cfg_{}.toml", std::process::id()));
        config.save_to_file(&path).unwrap();
        let loaded = AppConfig::load_from_file(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(
            loaded.gp.breeding_population_size,
            config.gp.breeding_population_size
        );
        assert_eq!(loaded.trading.initial_capital, config.trading.initial_capital);
    }

    #[test]
    fn invalid_file_is_rejected() {
        let path = std::env::temp_dir().join(format!("tradevolve_bad_{}.toml", std::process::id()));
        std::fs::write(&path, "[gp]\nbreeding_population_size = 0\n").unwrap();
        let result = AppConfig::load_from_file(&path);
        std::fs::remove_file(&path).ok();
        assert!(result.is_err());
    }
}
