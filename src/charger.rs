use crate::config::ChargerConfig;
use crate::error::ConfigError;
use log::debug;

/// Sub-intervals per grid cell for the Simpson integration of `1 / rate`.
const SIMPSON_STEPS: usize = 32;

/// Tabulated charging curve: cumulative seconds needed to charge an empty
/// pack to each SoC of a fixed grid. Built once, then only queried.
#[derive(Debug, Clone)]
pub struct ChargerModel {
    battery_capacity: f64,
    max_rate: f64,
    elbow_soc: f64,
    max_target_soc: f64,
    soc_grid: Vec<f64>,
    time_grid: Vec<f64>,
}

impl ChargerModel {
    pub fn precompute(config: &ChargerConfig, battery_capacity: f64) -> Result<ChargerModel, ConfigError> {
        config.validate()?;
        if !(battery_capacity.is_finite() && battery_capacity > 0.0) {
            return Err(ConfigError::InvalidParameter {
                name: "battery_capacity",
                reason: format!("{} is not a positive capacity", battery_capacity),
            });
        }

        let mut model = ChargerModel {
            battery_capacity,
            max_rate: config.max_charge_rate * config.efficiency,
            elbow_soc: config.elbow_soc,
            max_target_soc: config.max_target_soc,
            soc_grid: vec![],
            time_grid: vec![],
        };

        // rate falls to zero at soc 1.0, so a cap at (or past) full charge is unreachable
        if model.charge_rate(model.max_target_soc) <= 0.0 {
            return Err(ConfigError::ChargeRateExhausted {
                soc: 1.0,
                max_target_soc: model.max_target_soc,
            });
        }

        let steps = (config.max_target_soc / config.soc_resolution).ceil() as usize;
        let mut soc_grid: Vec<f64> = (0..steps)
            .map(|i| i as f64 * config.soc_resolution)
            .filter(|soc| *soc < config.max_target_soc - 1e-9)
            .collect();
        soc_grid.push(config.max_target_soc);

        let mut time_grid = Vec::with_capacity(soc_grid.len());
        let mut cumulative = 0.0;
        time_grid.push(cumulative);
        for cell in soc_grid.windows(2) {
            cumulative += model.seconds_between(cell[0], cell[1]);
            time_grid.push(cumulative);
        }

        debug!(
            "charger model for {} kWh: {} grid points, {:.0} s to reach soc {}",
            battery_capacity,
            soc_grid.len(),
            cumulative,
            model.max_target_soc
        );

        model.soc_grid = soc_grid;
        model.time_grid = time_grid;
        Ok(model)
    }

    /// Effective charge rate (kW) at a given SoC.
    pub fn charge_rate(&self, soc: f64) -> f64 {
        if soc <= self.elbow_soc {
            self.max_rate
        } else {
            let slope = self.max_rate / (1.0 - self.elbow_soc);
            self.max_rate - slope * (soc - self.elbow_soc)
        }
    }

    fn seconds_between(&self, from: f64, to: f64) -> f64 {
        let h = (to - from) / SIMPSON_STEPS as f64;
        let f = |soc: f64| 1.0 / self.charge_rate(soc);
        let mut sum = f(from) + f(to);
        for i in 1..SIMPSON_STEPS {
            let weight = if i % 2 == 1 { 4.0 } else { 2.0 };
            sum += weight * f(from + i as f64 * h);
        }
        sum * h / 3.0 * self.battery_capacity * 3600.0
    }

    pub fn soc_grid(&self) -> &[f64] {
        &self.soc_grid
    }

    pub fn time_grid(&self) -> &[f64] {
        &self.time_grid
    }

    /// Seconds needed to charge from empty to `max_target_soc`.
    pub fn full_charge_time(&self) -> f64 {
        self.time_grid.last().copied().unwrap_or(0.0)
    }

    pub fn query_final_soc(&self, initial_soc: f64, charge_time: f64) -> f64 {
        let initial_time = interp(initial_soc, &self.soc_grid, &self.time_grid);
        let final_soc = interp(initial_time + charge_time.max(0.0), &self.time_grid, &self.soc_grid);
        final_soc.clamp(0.0, self.max_target_soc)
    }

    pub fn query_charging_time(&self, initial_soc: f64, target_soc: f64) -> f64 {
        if target_soc <= initial_soc {
            return 0.0;
        }
        let initial_time = interp(initial_soc, &self.soc_grid, &self.time_grid);
        let target_time = interp(target_soc, &self.soc_grid, &self.time_grid);
        target_time - initial_time
    }
}

/// Piecewise-linear interpolation over increasing `xs`, holding the end values
/// outside the table.
fn interp(x: f64, xs: &[f64], ys: &[f64]) -> f64 {
    let last = xs.len() - 1;
    if x.is_nan() || x <= xs[0] {
        return ys[0];
    }
    if x >= xs[last] {
        return ys[last];
    }
    let i = xs.partition_point(|v| *v <= x);
    let (x0, x1) = (xs[i - 1], xs[i]);
    ys[i - 1] + (ys[i] - ys[i - 1]) * (x - x0) / (x1 - x0)
}
