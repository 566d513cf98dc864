use crate::error::ConfigError;
use crate::time::Time;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// One suspension per mission-profile leg.
    #[default]
    Fast,
    /// Legs are split into short sub-steps so positions can be streamed.
    Visual,
}

/// Piecewise charge-rate curve: constant up to `elbow_soc`, then falling
/// linearly to zero at full charge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChargerConfig {
    /// kW at the charger output
    pub max_charge_rate: f64,
    pub efficiency: f64,
    pub elbow_soc: f64,
    pub max_target_soc: f64,
    pub soc_resolution: f64,
}

impl Default for ChargerConfig {
    fn default() -> Self {
        ChargerConfig {
            max_charge_rate: 400.0,
            efficiency: 0.9,
            elbow_soc: 0.3,
            max_target_soc: 0.99,
            soc_resolution: 0.05,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub start_time: Time,
    pub end_time: Time,
    pub update_interval: Time,
    pub run_mode: RunMode,
    pub passenger_threshold: usize,
    pub max_wait_time: Time,
    pub energy_safety_factor: f64,
    pub min_reserve_soc: f64,
    pub full_soc: f64,
    pub flight_ready_soc: f64,
    pub airspace_entry_margin: Time,
    pub rebalancing: bool,
    pub deficit_buffer: f64,
    pub supply_buffer: f64,
    pub record_snapshots: bool,
    pub charger: ChargerConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        SimConfig {
            start_time: Time::ZERO,
            end_time: Time(86_400),
            update_interval: Time(120),
            run_mode: RunMode::Fast,
            passenger_threshold: 4,
            max_wait_time: Time(900),
            energy_safety_factor: 1.3,
            min_reserve_soc: 0.2,
            full_soc: 0.99,
            flight_ready_soc: 0.9,
            airspace_entry_margin: Time(20),
            rebalancing: true,
            deficit_buffer: 0.4,
            supply_buffer: 0.7,
            record_snapshots: true,
            charger: ChargerConfig::default(),
        }
    }
}

fn invalid(name: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidParameter {
        name,
        reason: reason.into(),
    }
}

fn unit_interval(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(invalid(name, format!("{} is outside [0, 1]", value)))
    }
}

impl SimConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.update_interval == Time::ZERO {
            return Err(invalid("update_interval", "must be positive"));
        }
        if self.start_time > self.end_time {
            return Err(invalid("start_time", "must not be after end_time"));
        }
        if self.passenger_threshold == 0 {
            return Err(invalid("passenger_threshold", "must be at least 1"));
        }
        if !(self.energy_safety_factor.is_finite() && self.energy_safety_factor >= 1.0) {
            return Err(invalid("energy_safety_factor", "must be a finite factor >= 1"));
        }
        unit_interval("min_reserve_soc", self.min_reserve_soc)?;
        unit_interval("full_soc", self.full_soc)?;
        unit_interval("flight_ready_soc", self.flight_ready_soc)?;
        unit_interval("deficit_buffer", self.deficit_buffer)?;
        if !(self.supply_buffer.is_finite() && self.supply_buffer >= 0.0) {
            return Err(invalid("supply_buffer", "must be non-negative"));
        }
        if self.flight_ready_soc > self.full_soc {
            return Err(invalid("flight_ready_soc", "must not exceed full_soc"));
        }
        // charging stops at the charger cap, so a higher "full" mark is never reached
        if self.full_soc > self.charger.max_target_soc {
            return Err(invalid(
                "full_soc",
                format!("{} is above the charger cap {}", self.full_soc, self.charger.max_target_soc),
            ));
        }
        self.charger.validate()
    }
}

impl ChargerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.max_charge_rate.is_finite() && self.max_charge_rate > 0.0) {
            return Err(invalid("charger.max_charge_rate", "must be positive"));
        }
        if !(self.efficiency > 0.0 && self.efficiency <= 1.0) {
            return Err(invalid("charger.efficiency", "must be in (0, 1]"));
        }
        if !(0.0..1.0).contains(&self.elbow_soc) {
            return Err(invalid("charger.elbow_soc", "must be in [0, 1)"));
        }
        if !(self.max_target_soc > 0.0 && self.max_target_soc <= 1.0) {
            return Err(invalid("charger.max_target_soc", "must be in (0, 1]"));
        }
        if !(self.soc_resolution > 0.0 && self.soc_resolution <= self.max_target_soc) {
            return Err(invalid("charger.soc_resolution", "must be in (0, max_target_soc]"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(SimConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: SimConfig =
            serde_json::from_str(r#"{"passenger_threshold": 1, "run_mode": "visual", "charger": {"efficiency": 0.8}}"#)
                .unwrap();
        assert_eq!(1, config.passenger_threshold);
        assert_eq!(RunMode::Visual, config.run_mode);
        assert_eq!(0.8, config.charger.efficiency);
        assert_eq!(400.0, config.charger.max_charge_rate);
        assert_eq!(Time(900), config.max_wait_time);
    }

    #[test]
    fn test_full_soc_above_charger_cap_is_rejected() {
        let config = SimConfig {
            full_soc: 0.995,
            ..SimConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidParameter { name: "full_soc", .. })
        ));
    }

    #[test]
    fn test_bad_charger_parameters_are_rejected() {
        let mut config = SimConfig::default();
        config.charger.elbow_soc = 1.0;
        assert!(config.validate().is_err());
        config.charger = ChargerConfig {
            efficiency: 0.0,
            ..ChargerConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
