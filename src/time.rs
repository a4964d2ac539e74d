//! Wall-clock timing and the fixed-step accumulator.
//!
//! [`Time`] measures how much real time passed between frames.
//! [`FixedTimestep`] turns those variable frame durations into a whole number
//! of constant-size simulation steps, carrying the remainder to the next
//! frame. The two are kept apart so the accumulator can be fed synthetic
//! frame times in tests.
//!
//! # Example
//!
//! ```
//! use particle_engine::time::FixedTimestep;
//!
//! let mut stepper = FixedTimestep::new(1.0 / 144.0, 0.2).unwrap();
//!
//! // A 10 second stall only produces 0.2 seconds of catch-up.
//! assert!(stepper.accumulate(10.0));
//! let mut steps = 0;
//! while stepper.step() {
//!     steps += 1;
//! }
//! assert!(steps <= 28);
//! ```

use std::time::{Duration, Instant};

use crate::error::ConfigError;

/// Default fixed step: 144 updates per simulated second.
pub const DEFAULT_TIMESTEP: f64 = 1.0 / 144.0;

/// Default accumulator ceiling in seconds.
pub const DEFAULT_MAX_ACCUMULATOR: f64 = 0.2;

/// Drains accumulated frame time in constant `dt` increments.
///
/// The accumulator is clamped to `max_accumulator` whenever time is added, so
/// a long stall (a debugger pause, a dragged window) costs at most
/// `max_accumulator / dt` steps instead of replaying the whole gap.
#[derive(Clone, Debug, PartialEq)]
pub struct FixedTimestep {
    dt: f64,
    max_accumulator: f64,
    accumulator: f64,
    steps: u64,
}

impl FixedTimestep {
    /// Create a stepper with step size `dt` and accumulator ceiling `max_accumulator`.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Invalid`] unless `dt` is positive and finite and
    /// `max_accumulator >= dt`.
    pub fn new(dt: f64, max_accumulator: f64) -> Result<Self, ConfigError> {
        if !(dt.is_finite() && dt > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "timestep must be positive and finite, got {dt}"
            )));
        }
        if !(max_accumulator.is_finite() && max_accumulator >= dt) {
            return Err(ConfigError::Invalid(format!(
                "max_accumulator ({max_accumulator}) must be at least the timestep ({dt})"
            )));
        }

        Ok(Self {
            dt,
            max_accumulator,
            accumulator: 0.0,
            steps: 0,
        })
    }

    /// Step size in seconds.
    #[inline]
    pub fn dt(&self) -> f64 {
        self.dt
    }

    #[inline]
    pub fn max_accumulator(&self) -> f64 {
        self.max_accumulator
    }

    /// Time carried over that has not been simulated yet.
    #[inline]
    pub fn remainder(&self) -> f64 {
        self.accumulator
    }

    /// Total steps taken since creation or the last [`reset`](Self::reset).
    #[inline]
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Simulated time: steps taken times `dt`.
    #[inline]
    pub fn sim_time(&self) -> f64 {
        self.steps as f64 * self.dt
    }

    /// Add a frame's elapsed time.
    ///
    /// Negative or non-finite values are ignored. Returns `true` when the
    /// ceiling was hit and time was dropped.
    pub fn accumulate(&mut self, elapsed: f64) -> bool {
        if elapsed.is_finite() && elapsed > 0.0 {
            self.accumulator += elapsed;
        }

        if self.accumulator > self.max_accumulator {
            log::debug!(
                "frame time clamped: {:.3}s pending, keeping {:.3}s",
                self.accumulator,
                self.max_accumulator
            );
            self.accumulator = self.max_accumulator;
            return true;
        }
        false
    }

    /// Consume one `dt` if enough time has accumulated.
    pub fn step(&mut self) -> bool {
        if self.accumulator >= self.dt {
            self.accumulator -= self.dt;
            self.steps += 1;
            true
        } else {
            false
        }
    }

    /// Drop pending time and the step count.
    pub fn reset(&mut self) {
        self.accumulator = 0.0;
        self.steps = 0;
    }
}

impl Default for FixedTimestep {
    fn default() -> Self {
        Self {
            dt: DEFAULT_TIMESTEP,
            max_accumulator: DEFAULT_MAX_ACCUMULATOR,
            accumulator: 0.0,
            steps: 0,
        }
    }
}

/// Wall-clock frame timing for the windowed runner.
///
/// Tracks frame delta, frame count and a periodically refreshed FPS figure.
#[derive(Debug)]
pub struct Time {
    start: Instant,
    last_frame: Instant,
    /// Time since last frame in seconds, after scaling.
    delta_secs: f64,
    frame_count: u64,
    fps: f32,
    fps_frame_count: u64,
    fps_update_time: Instant,
    fps_update_interval: Duration,
    paused: bool,
    time_scale: f64,
}

impl Time {
    /// Create a new time tracker starting from now.
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            start: now,
            last_frame: now,
            delta_secs: 0.0,
            frame_count: 0,
            fps: 0.0,
            fps_frame_count: 0,
            fps_update_time: now,
            fps_update_interval: Duration::from_millis(500),
            paused: false,
            time_scale: 1.0,
        }
    }

    /// Mark the start of a frame and return the scaled seconds since the
    /// previous one. Returns 0 while paused.
    pub fn update(&mut self) -> f64 {
        let now = Instant::now();
        let raw_delta = now.duration_since(self.last_frame).as_secs_f64();
        self.last_frame = now;

        if self.paused {
            self.delta_secs = 0.0;
            return self.delta_secs;
        }

        self.delta_secs = raw_delta * self.time_scale;
        self.frame_count += 1;

        let fps_elapsed = now.duration_since(self.fps_update_time);
        if fps_elapsed >= self.fps_update_interval {
            let frames_since = self.frame_count - self.fps_frame_count;
            self.fps = frames_since as f32 / fps_elapsed.as_secs_f32();
            self.fps_frame_count = self.frame_count;
            self.fps_update_time = now;
        }

        self.delta_secs
    }

    #[inline]
    pub fn delta(&self) -> f64 {
        self.delta_secs
    }

    /// Real time since the tracker was created, pauses included.
    #[inline]
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    #[inline]
    pub fn frame(&self) -> u64 {
        self.frame_count
    }

    #[inline]
    pub fn fps(&self) -> f32 {
        self.fps
    }

    #[inline]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    #[inline]
    pub fn time_scale(&self) -> f64 {
        self.time_scale
    }

    /// Stop feeding time to the simulation.
    pub fn pause(&mut self) {
        self.paused = true;
    }

    /// Resume after [`pause`](Self::pause). The paused gap is not replayed.
    pub fn resume(&mut self) {
        if self.paused {
            self.last_frame = Instant::now();
            self.paused = false;
        }
    }

    pub fn toggle_pause(&mut self) {
        if self.paused {
            self.resume();
        } else {
            self.pause();
        }
    }

    /// Set time scale multiplier.
    ///
    /// - `1.0` = normal speed
    /// - `0.5` = half speed (slow motion)
    /// - `2.0` = double speed
    pub fn set_time_scale(&mut self, scale: f64) {
        self.time_scale = scale.max(0.0);
    }
}

impl Default for Time {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    const DT: f64 = 1.0 / 144.0;

    fn drain(stepper: &mut FixedTimestep) -> u32 {
        let mut steps = 0;
        while stepper.step() {
            steps += 1;
        }
        steps
    }

    #[test]
    fn test_rejects_bad_timestep() {
        assert!(FixedTimestep::new(0.0, 0.2).is_err());
        assert!(FixedTimestep::new(-1.0, 0.2).is_err());
        assert!(FixedTimestep::new(f64::NAN, 0.2).is_err());
        assert!(FixedTimestep::new(0.1, 0.05).is_err());
    }

    #[test]
    fn test_remainder_carries_over() {
        let mut stepper = FixedTimestep::new(0.25, 1.0).unwrap();

        stepper.accumulate(0.6);
        assert_eq!(drain(&mut stepper), 2);
        assert!((stepper.remainder() - 0.1).abs() < 1e-9);

        stepper.accumulate(0.2);
        assert_eq!(drain(&mut stepper), 1);
        assert_eq!(stepper.steps(), 3);
        assert!((stepper.sim_time() - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_clamp_limits_catch_up() {
        let mut stepper = FixedTimestep::new(DT, 0.2).unwrap();

        assert!(stepper.accumulate(10.0));
        let steps = drain(&mut stepper);

        assert!(steps as f64 <= 0.2 / DT);
        assert!(steps >= 27);
    }

    #[test]
    fn test_negative_elapsed_is_ignored() {
        let mut stepper = FixedTimestep::new(DT, 0.2).unwrap();
        assert!(!stepper.accumulate(-5.0));
        assert!(!stepper.accumulate(f64::INFINITY));
        assert_eq!(stepper.remainder(), 0.0);
    }

    #[test]
    fn test_reset_drops_pending_time() {
        let mut stepper = FixedTimestep::new(0.25, 1.0).unwrap();
        stepper.accumulate(0.6);
        drain(&mut stepper);

        stepper.reset();

        assert_eq!(stepper.steps(), 0);
        assert_eq!(stepper.remainder(), 0.0);
        assert_eq!(stepper.sim_time(), 0.0);
        assert_eq!(stepper.dt(), 0.25);
        assert!(!stepper.step());
    }

    #[test]
    fn test_time_new() {
        let time = Time::new();
        assert_eq!(time.frame(), 0);
        assert!(!time.is_paused());
        assert_eq!(time.time_scale(), 1.0);
    }

    #[test]
    fn test_time_update() {
        let mut time = Time::new();
        thread::sleep(Duration::from_millis(10));
        let delta = time.update();

        assert!(delta > 0.0);
        assert_eq!(time.delta(), delta);
        assert_eq!(time.frame(), 1);
        assert!(time.elapsed() >= Duration::from_millis(10));
    }

    #[test]
    fn test_time_pause() {
        let mut time = Time::new();
        time.update();

        time.pause();
        thread::sleep(Duration::from_millis(10));
        assert_eq!(time.update(), 0.0);
        assert_eq!(time.delta(), 0.0);

        time.resume();
        thread::sleep(Duration::from_millis(5));
        let delta = time.update();
        assert!(delta > 0.0 && delta < 1.0);
    }

    #[test]
    fn test_time_scale() {
        let mut time = Time::new();
        time.set_time_scale(2.0);
        assert_eq!(time.time_scale(), 2.0);

        // Negative scale should clamp to 0
        time.set_time_scale(-1.0);
        assert_eq!(time.time_scale(), 0.0);
    }
}
