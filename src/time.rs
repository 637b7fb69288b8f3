pub use std::time::Instant;

use crate::renderer::FrameStats;

/// Longest step fed to update logic, so a stall does not teleport players.
pub const MAX_FRAME_TIME: f32 = 0.1;

const REPORT_INTERVAL: f32 = 1.0;

/// Frame delta timing and a once-per-second frame rate log.
#[derive(Debug)]
pub struct FrameClock {
    last: Instant,
    elapsed: f32,
    frames: u32,
}

impl FrameClock {
    pub fn new() -> Self {
        Self {
            last: Instant::now(),
            elapsed: 0.0,
            frames: 0,
        }
    }

    /// Seconds since the previous tick, capped at [`MAX_FRAME_TIME`].
    pub fn tick(&mut self) -> f32 {
        let now = Instant::now();
        let dt = now.duration_since(self.last).as_secs_f32();
        self.last = now;
        dt.min(MAX_FRAME_TIME)
    }

    /// Counts a rendered frame. Returns the average frame rate whenever a
    /// report interval has passed.
    pub fn record(&mut self, dt: f32, stats: &FrameStats) -> Option<f32> {
        self.frames += 1;
        self.elapsed += dt;
        if self.elapsed < REPORT_INTERVAL {
            return None;
        }

        let fps = self.frames as f32 / self.elapsed;
        log::info!(
            "{fps:.1} fps, {} draw calls ({} shadow, {} main)",
            stats.total_draw_calls(),
            stats.shadow_draws,
            stats.main_draws
        );
        self.frames = 0;
        self.elapsed = 0.0;
        Some(fps)
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_once_per_interval() {
        let mut clock = FrameClock::new();
        let stats = FrameStats::default();
        for _ in 0..3 {
            assert_eq!(clock.record(0.25, &stats), None);
        }
        let fps = clock.record(0.25, &stats).expect("interval elapsed");
        assert!((fps - 4.0).abs() < 1e-4);
        assert_eq!(clock.record(0.25, &stats), None);
    }

    #[test]
    fn tick_is_capped() {
        let mut clock = FrameClock::new();
        assert!(clock.tick() <= MAX_FRAME_TIME);
    }
}
