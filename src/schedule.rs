//! Scripted events keyed on simulated time.
//!
//! Scenario logic such as "release the grid after five seconds" does not
//! belong inside the integration step. It is registered on a [`Timeline`]
//! instead, and the fixed-step driver fires due events between steps, before
//! the scene and the pool are advanced.
//!
//! ```
//! use particle_engine::{Simulation, Timeline, Vec2};
//!
//! let mut sim = Simulation::new().with_capacity(16);
//! sim.timeline_mut().at(0.5, |world, _now| {
//!     world.scene.set_velocity(Vec2::new(1.0, 0.0));
//! });
//! sim.frame(0.1).unwrap();
//! assert_eq!(sim.world().scene.velocity(), Vec2::ZERO);
//! for _ in 0..5 {
//!     sim.frame(0.1).unwrap();
//! }
//! assert_eq!(sim.world().scene.velocity(), Vec2::new(1.0, 0.0));
//! ```

use crate::simulation::World;

type Action = Box<dyn FnMut(&mut World, f64)>;

struct ScheduledEvent {
    due: f64,
    period: Option<f64>,
    action: Action,
}

/// Ordered set of one-shot and periodic events.
#[derive(Default)]
pub struct Timeline {
    events: Vec<ScheduledEvent>,
}

impl std::fmt::Debug for Timeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Timeline")
            .field("pending", &self.events.len())
            .finish()
    }
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `action` once, at the first step starting at or after `time` seconds.
    pub fn at<F>(&mut self, time: f64, action: F) -> &mut Self
    where
        F: FnMut(&mut World, f64) + 'static,
    {
        self.events.push(ScheduledEvent {
            due: time.max(0.0),
            period: None,
            action: Box::new(action),
        });
        self
    }

    /// Run `action` every `period` seconds, first at `period`.
    ///
    /// A non-positive period is ignored.
    pub fn every<F>(&mut self, period: f64, action: F) -> &mut Self
    where
        F: FnMut(&mut World, f64) + 'static,
    {
        if period > 0.0 && period.is_finite() {
            self.events.push(ScheduledEvent {
                due: period,
                period: Some(period),
                action: Box::new(action),
            });
        } else {
            log::warn!("ignoring periodic event with period {}", period);
        }
        self
    }

    /// Number of events still pending.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Fire every event due at `now`, in registration order.
    ///
    /// One-shot events are removed after firing. A periodic event fires at
    /// most once per call and is rescheduled past `now`, so a missed backlog
    /// is skipped rather than replayed. Returns the number of events fired.
    pub(crate) fn fire_due(&mut self, now: f64, world: &mut World) -> usize {
        let mut fired = 0;
        let mut i = 0;
        while i < self.events.len() {
            if self.events[i].due > now {
                i += 1;
                continue;
            }

            (self.events[i].action)(world, now);
            fired += 1;

            match self.events[i].period {
                Some(period) => {
                    let event = &mut self.events[i];
                    while event.due <= now {
                        event.due += period;
                    }
                    i += 1;
                }
                None => {
                    self.events.remove(i);
                }
            }
        }
        fired
    }
}
