use crate::error::BatteryError;
use serde::Serialize;

/// Battery pack state. Energy values share the unit of `capacity` (kWh).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Battery {
    pub capacity: f64,
    soc: f64,
}

impl Battery {
    /// A fully charged pack.
    pub fn new(capacity: f64) -> Battery {
        Battery::with_soc(capacity, 1.0)
    }

    pub fn with_soc(capacity: f64, soc: f64) -> Battery {
        Battery { capacity, soc }
    }

    pub fn soc(&self) -> f64 {
        self.soc
    }

    pub fn energy_as_soc(&self, energy: f64) -> f64 {
        energy / self.capacity
    }

    /// Draws flight energy. Running the pack below zero is refused and leaves
    /// the state untouched.
    pub fn drain(&mut self, energy: f64) -> Result<(), BatteryError> {
        let soc = self.soc - self.energy_as_soc(energy);
        if soc < 0.0 {
            return Err(BatteryError::Depleted { energy, soc });
        }
        self.soc = soc;
        Ok(())
    }

    /// Applies the result of a charger query. Charging never lowers the charge.
    pub(crate) fn charge_to(&mut self, soc: f64) {
        self.soc = self.soc.max(soc.min(1.0));
    }
}
