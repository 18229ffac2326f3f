//! Clock sources: SPICE-style pulse waveforms stamped as voltage sources.

use crate::circuit::{BranchId, NodeId};

/// A periodic pulse waveform.
///
/// Parameters follow the SPICE PULSE convention: the level starts at
/// `initial`, ramps to `pulsed` over `rise`, holds for `width`, ramps back
/// over `fall`, and repeats with `period` after an initial `delay`.
#[derive(Debug, Clone)]
pub struct Pulse {
    /// Level before the first edge and between pulses
    pub initial: f64,
    /// Level during the high phase
    pub pulsed: f64,
    /// Time before the first rising edge
    pub delay: f64,
    /// Rise time
    pub rise: f64,
    /// Fall time
    pub fall: f64,
    /// High-phase duration (excluding edges)
    pub width: f64,
    /// Repetition period
    pub period: f64,
}

impl Pulse {
    /// A square clock at `hz` between `low` and `high` with 50% duty.
    ///
    /// Edge times are derived from the frequency the way the schematic
    /// editor's clock component did: edge fraction 0.1 below 1 MHz, 0.05
    /// below 1 GHz, 0.01 above.
    pub fn square(hz: f64, low: f64, high: f64) -> Self {
        let period = 1.0 / hz;
        let width = period * 0.5;

        let edge_fraction = if hz < 1e6 {
            0.1
        } else if hz < 1e9 {
            0.05
        } else {
            0.01
        };
        let edge = width * edge_fraction;

        Self {
            initial: low,
            pulsed: high,
            delay: 0.0,
            rise: edge,
            fall: edge,
            width,
            period,
        }
    }

    /// A constant level (useful for rails and tied control pins).
    pub fn dc(level: f64) -> Self {
        Self {
            initial: level,
            pulsed: level,
            delay: 0.0,
            rise: 0.0,
            fall: 0.0,
            width: f64::INFINITY,
            period: f64::INFINITY,
        }
    }

    /// The waveform level at time `t`.
    pub fn level(&self, t: f64) -> f64 {
        if t < self.delay {
            return self.initial;
        }
        let tp = (t - self.delay) % self.period;

        if tp < self.rise {
            self.initial + (self.pulsed - self.initial) * tp / self.rise
        } else if tp < self.rise + self.width {
            self.pulsed
        } else if tp < self.rise + self.width + self.fall {
            let into_fall = tp - self.rise - self.width;
            self.pulsed + (self.initial - self.pulsed) * into_fall / self.fall
        } else {
            self.initial
        }
    }
}

/// A clock source resolved onto solver nodes, ready for stamping.
#[derive(Debug, Clone)]
pub struct ClockInstance {
    pub name: String,
    /// Driven output node
    pub node: NodeId,
    /// Ground reference node
    pub ground: NodeId,
    /// Branch variable carrying the source current
    pub branch: BranchId,
    pub pulse: Pulse,
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_square_waveform_levels() {
        let pulse = Pulse::square(20_000.0, 0.0, 5.0);
        let period = 1.0 / 20_000.0;

        // Mid high phase and mid low phase
        assert_relative_eq!(pulse.level(period * 0.25), 5.0);
        assert_relative_eq!(pulse.level(period * 0.8), 0.0);
        // Second period repeats
        assert_relative_eq!(pulse.level(period * 1.25), 5.0);
    }

    #[test]
    fn test_square_edges_ramp() {
        let pulse = Pulse::square(20_000.0, 0.0, 5.0);
        let half_rise = pulse.rise * 0.5;
        assert_relative_eq!(pulse.level(half_rise), 2.5, epsilon = 1e-9);
    }

    #[test]
    fn test_dc_is_constant() {
        let pulse = Pulse::dc(5.0);
        assert_relative_eq!(pulse.level(0.0), 5.0);
        assert_relative_eq!(pulse.level(1.0e3), 5.0);
    }
}
