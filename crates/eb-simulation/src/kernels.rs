//! Pure physical and biological rate laws shared by the law systems.

use glam::DVec3;

/// Universal gas constant, J/(mol·K).
pub const GAS_CONSTANT: f64 = 8.314;
/// Boltzmann constant, J/K.
pub const BOLTZMANN: f64 = 1.380_649e-23;
/// Default Arrhenius pre-exponential factor, 1/s.
pub const DEFAULT_PRE_EXPONENTIAL: f64 = 1e13;
/// Reference body temperature for metabolic scaling, K.
pub const REFERENCE_BODY_TEMPERATURE: f64 = 310.0;

/// Reaction rate constant `A·exp(−Ea/(R·T))`. Zero at or below absolute zero.
pub fn arrhenius(activation_energy: f64, temperature: f64, pre_exponential: f64) -> f64 {
    if temperature <= 0.0 {
        return 0.0;
    }
    pre_exponential * (-activation_energy / (GAS_CONSTANT * temperature)).exp()
}

/// Probability that a process with the given rate fires within `dt`.
pub fn event_probability(rate: f64, dt: f64) -> f64 {
    1.0 - (-rate * dt).exp()
}

/// `½·m·|v|²`.
pub fn kinetic_energy(mass: f64, velocity: DVec3) -> f64 {
    0.5 * mass * velocity.length_squared()
}

/// `m·v`.
pub fn momentum(mass: f64, velocity: DVec3) -> DVec3 {
    velocity * mass
}

/// Kleiber's law: basal metabolic rate `70·m^0.75`.
pub fn kleiber(mass: f64) -> f64 {
    70.0 * mass.max(0.0).powf(0.75)
}

/// Kleiber rate scaled by temperature relative to `reference`.
pub fn metabolic_rate(mass: f64, temperature: f64, reference: f64) -> f64 {
    kleiber(mass) * (0.05 * (temperature - reference)).exp()
}

/// Logistic growth `r·N·(1 − N/K)`. No growth without a positive capacity.
pub fn logistic_growth(count: f64, capacity: f64, rate: f64) -> f64 {
    if capacity <= 0.0 {
        return 0.0;
    }
    rate * count * (1.0 - count / capacity)
}

/// Mean thermal energy per particle, `1.5·k_B·T`.
pub fn thermal_energy(temperature: f64) -> f64 {
    1.5 * BOLTZMANN * temperature
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arrhenius_increases_with_temperature() {
        let cold = arrhenius(80_000.0, 300.0, DEFAULT_PRE_EXPONENTIAL);
        let hot = arrhenius(80_000.0, 600.0, DEFAULT_PRE_EXPONENTIAL);
        assert!(hot > cold);
        assert!(cold > 0.1 && cold < 0.13);
        assert_eq!(arrhenius(80_000.0, 0.0, DEFAULT_PRE_EXPONENTIAL), 0.0);
    }

    #[test]
    fn event_probability_bounds() {
        assert_eq!(event_probability(0.0, 1.0), 0.0);
        let p = event_probability(1.0, 1.0);
        assert!((p - (1.0 - (-1.0f64).exp())).abs() < 1e-12);
        assert!(event_probability(1e6, 1.0) <= 1.0);
    }

    #[test]
    fn kinetic_energy_and_momentum() {
        let v = DVec3::new(3.0, 4.0, 0.0);
        assert_eq!(kinetic_energy(2.0, v), 25.0);
        assert_eq!(momentum(2.0, v), DVec3::new(6.0, 8.0, 0.0));
    }

    #[test]
    fn kleiber_scaling() {
        assert!((kleiber(1.0) - 70.0).abs() < 1e-12);
        assert!((kleiber(16.0) - 70.0 * 8.0).abs() < 1e-9);
        assert_eq!(kleiber(-5.0), 0.0);
        let at_reference = metabolic_rate(16.0, 310.0, REFERENCE_BODY_TEMPERATURE);
        assert!((at_reference - kleiber(16.0)).abs() < 1e-9);
        assert!(metabolic_rate(16.0, 320.0, REFERENCE_BODY_TEMPERATURE) > at_reference);
    }

    #[test]
    fn logistic_growth_stalls_at_capacity() {
        assert_eq!(logistic_growth(100.0, 100.0, 0.5), 0.0);
        assert!(logistic_growth(10.0, 100.0, 0.5) > 0.0);
        assert!(logistic_growth(150.0, 100.0, 0.5) < 0.0);
        assert_eq!(logistic_growth(10.0, 0.0, 0.5), 0.0);
    }

    #[test]
    fn thermal_energy_is_linear() {
        assert!((thermal_energy(200.0) - 2.0 * thermal_energy(100.0)).abs() < 1e-30);
    }
}
