//! Fixed-timestep scheduler decoupling simulation ticks from rendering

use std::time::{Duration, Instant};

/// The two phases driven by the scheduler
pub trait Simulation {
    /// One fixed-rate simulation step
    fn update(&mut self);

    /// Draw the current state. Called at most once per invocation.
    fn render(&mut self);
}

/// Outcome of a single scheduler invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StepReport {
    pub ticks_run: u32,
    pub rendered: bool,
    /// True when the catch-up bound stopped the loop with ticks still due
    pub fell_behind: bool,
}

/// Accumulates elapsed time into whole ticks
#[derive(Debug, Clone)]
pub struct FixedTimestep {
    tick_interval: Duration,
    max_ticks_per_invocation: u32,
    next_tick_deadline: Instant,
    paused: bool,
    total_ticks: u64,
}

impl FixedTimestep {
    /// The first tick falls due one interval after `start`.
    pub fn new(tick_interval: Duration, max_ticks_per_invocation: u32, start: Instant) -> Self {
        Self {
            tick_interval,
            max_ticks_per_invocation: max_ticks_per_invocation.max(1),
            next_tick_deadline: start + tick_interval,
            paused: false,
            total_ticks: 0,
        }
    }

    pub fn total_ticks(&self) -> u64 {
        self.total_ticks
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    /// Restart from `now` without replaying the time spent paused
    pub fn resume(&mut self, now: Instant) {
        self.paused = false;
        self.next_tick_deadline = now + self.tick_interval;
    }

    /// Run every tick due at `now`, up to the catch-up bound, then render once
    pub fn step<S: Simulation + ?Sized>(&mut self, now: Instant, sim: &mut S) -> StepReport {
        if self.paused {
            return StepReport::default();
        }

        let mut ticks_run = 0;
        while now >= self.next_tick_deadline && ticks_run < self.max_ticks_per_invocation {
            sim.update();
            self.next_tick_deadline += self.tick_interval;
            ticks_run += 1;
        }
        self.total_ticks += u64::from(ticks_run);

        let rendered = ticks_run > 0;
        if rendered {
            sim.render();
        }

        StepReport {
            ticks_run,
            rendered,
            fell_behind: now >= self.next_tick_deadline,
        }
    }
}
