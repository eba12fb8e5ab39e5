use super::traits::ConfigSection;
use crate::error::TradevolveError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GpConfig {
    pub breeding_population_size: usize,
    pub generations: usize,
    pub proposals_per_generation: usize,
    pub min_rule_size: usize,
    pub max_rule_size: usize,
    pub seed: Option<u64>,
}

impl Default for GpConfig {
    fn default() -> Self {
        Self {
            breeding_population_size: 50,
            generations: 10,
            proposals_per_generation: 500,
            min_rule_size: 3,
            max_rule_size: 15,
            seed: None,
        }
    }
}

impl ConfigSection for GpConfig {
    fn section_name() -> &'static str {
        "gp"
    }

    fn validate(&self) -> Result<(), TradevolveError> {
        if self.breeding_population_size < 2 {
            return Err(TradevolveError::Configuration(
                "Breeding population size must be at least 2".to_string(),
            ));
        }
        if self.min_rule_size < 1 {
            return Err(TradevolveError::Configuration(
                "Minimum rule size must be at least 1".to_string(),
            ));
        }
        if self.min_rule_size > self.max_rule_size {
            return Err(TradevolveError::Configuration(
                "Minimum rule size must not exceed maximum rule size".to_string(),
            ));
        }
        if self.proposals_per_generation == 0 {
            return Err(TradevolveError::Configuration(
                "Proposals per generation must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(GpConfig::default().validate().is_ok());
    }

    #[test]
    fn inverted_size_bounds_rejected() {
        let config = GpConfig {
            min_rule_size: 20,
            max_rule_size: 15,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
