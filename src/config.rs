use std::time::Duration;

/// Build-time configuration. There is no config file; the defaults are the
/// whole story, but keeping them in a struct lets tests run smaller arenas.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Config {
    pub(crate) arena_width: f64,
    pub(crate) arena_height: f64,
    pub(crate) segment_size: f64,
    pub(crate) body_length: usize,
    /// Logical simulation ticks per second.
    pub(crate) tick_rate: u32,
    pub(crate) min_speed: f64,
    pub(crate) max_speed: f64,
    pub(crate) speed_delta: f64,
    pub(crate) initial_speed: f64,
    pub(crate) message_duration: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            arena_width: 800.0,
            arena_height: 600.0,
            segment_size: 20.0,
            body_length: 20,
            tick_rate: 90,
            min_speed: 0.5,
            max_speed: 4.0,
            speed_delta: 0.2,
            initial_speed: 2.0,
            message_duration: Duration::from_millis(1500),
        }
    }
}

impl Config {
    pub(crate) fn tick_step(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.tick_rate.max(1) as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_speed_bounds_are_ordered() {
        let cfg = Config::default();
        assert!(cfg.min_speed < cfg.max_speed);
        assert!(cfg.initial_speed >= cfg.min_speed && cfg.initial_speed <= cfg.max_speed);
        assert!(cfg.speed_delta > 0.0);
    }

    #[test]
    fn tick_step_matches_rate() {
        let cfg = Config::default();
        let step = cfg.tick_step();
        assert!((step.as_secs_f64() - 1.0 / 90.0).abs() < 1e-12);
    }
}
