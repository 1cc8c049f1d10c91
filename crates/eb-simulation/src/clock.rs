/// Tracks simulation time: a monotonic tick counter and elapsed seconds.
#[derive(Debug, Clone)]
pub struct SimClock {
    tick: u64,
    default_dt: f64,
    last_dt: f64,
    elapsed: f64,
}

impl SimClock {
    /// Create a new clock at tick 0 with the given default tick duration.
    pub fn new(default_dt: f64) -> Self {
        Self {
            tick: 0,
            default_dt,
            last_dt: 0.0,
            elapsed: 0.0,
        }
    }

    /// Advance the clock by one tick of `dt` seconds. Returns the new tick number.
    pub fn advance(&mut self, dt: f64) -> u64 {
        self.tick += 1;
        self.last_dt = dt;
        self.elapsed += dt;
        self.tick
    }

    /// Number of ticks advanced so far.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Duration of the most recent tick. Zero before the first tick.
    pub fn last_dt(&self) -> f64 {
        self.last_dt
    }

    /// Tick duration used by `Simulation::run`.
    pub fn default_dt(&self) -> f64 {
        self.default_dt
    }

    /// Total simulated seconds since start.
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_initial_state() {
        let clock = SimClock::new(1.0);
        assert_eq!(clock.tick(), 0);
        assert_eq!(clock.elapsed(), 0.0);
        assert_eq!(clock.last_dt(), 0.0);
    }

    #[test]
    fn clock_advance_accumulates_variable_steps() {
        let mut clock = SimClock::new(1.0);
        clock.advance(0.5);
        clock.advance(2.0);
        assert_eq!(clock.advance(1.5), 3);
        assert!((clock.elapsed() - 4.0).abs() < f64::EPSILON);
        assert!((clock.last_dt() - 1.5).abs() < f64::EPSILON);
        assert!((clock.default_dt() - 1.0).abs() < f64::EPSILON);
    }
}
