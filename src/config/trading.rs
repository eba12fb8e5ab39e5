use super::traits::ConfigSection;
use crate::error::TradevolveError;
use crate::trading::StockSizing;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradingConfig {
    pub initial_capital: f64,
    pub trade_cost: f64,
    pub sizing: StockSizing,
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            initial_capital: 50_000.0,
            trade_cost: 25.0,
            sizing: StockSizing::FixedValue(5_000.0),
        }
    }
}

impl ConfigSection for TradingConfig {
    fn section_name() -> &'static str {
        "trading"
    }

    fn validate(&self) -> Result<(), TradevolveError> {
        if self.initial_capital <= 0.0 {
            return Err(TradevolveError::Configuration(
                "Initial capital must be positive".to_string(),
            ));
        }
        if self.trade_cost < 0.0 {
            return Err(TradevolveError::Configuration(
                "Trade cost must not be negative".to_string(),
            ));
        }
        let sized = match self.sizing {
            StockSizing::FixedValue(value) => value,
            StockSizing::FixedCount(count) => count,
        };
        if sized <= 0.0 {
            return Err(TradevolveError::Configuration(
                "Position sizing must be positive".to_string(),
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
        assert!(TradingConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_sizing_rejected() {
        let config = TradingConfig {
            sizing: StockSizing::FixedCount(0.0),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
