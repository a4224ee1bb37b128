//! Client state threaded through every component of a session

use std::io;
use std::time::Instant;

use tracing::debug;

use crate::config::Config;
use crate::game::{FixedTimestep, GameState, InputSampler, Simulation, StepReport};
use crate::http::Registration;
use crate::render::{render_frame, Canvas};
use crate::util::time::tick_interval;
use crate::ws::{Applied, InboundStats, InputSink, MessageHandler, PlayerRouting};

/// Everything a session owns apart from its I/O handles
pub struct ClientState {
    pub game: GameState,
    pub sampler: InputSampler,
    handler: MessageHandler,
    timestep: FixedTimestep,
    inputs_sent: u64,
}

impl ClientState {
    pub fn new(config: &Config, registration: &Registration, now: Instant) -> Self {
        let routing = if config.track_peers {
            PlayerRouting::ByUserId(registration.user_id.to_string())
        } else {
            PlayerRouting::FirstRecord
        };

        Self {
            game: registration.seed_state(),
            sampler: InputSampler::new(),
            handler: MessageHandler::new(routing),
            timestep: FixedTimestep::new(
                tick_interval(config.fps),
                config.max_ticks_per_invocation,
                now,
            ),
            inputs_sent: 0,
        }
    }

    /// Apply one inbound text frame
    pub fn on_message(&mut self, text: &str) -> Applied {
        self.handler.handle_text(&mut self.game, text)
    }

    pub fn inbound_stats(&self) -> InboundStats {
        self.handler.stats()
    }

    pub fn inputs_sent(&self) -> u64 {
        self.inputs_sent
    }

    pub fn is_paused(&self) -> bool {
        self.timestep.is_paused()
    }

    pub fn total_ticks(&self) -> u64 {
        self.timestep.total_ticks()
    }

    /// Stop ticking while the connection is down
    pub fn pause(&mut self) {
        self.timestep.pause();
    }

    /// Resume ticking on a fresh connection; the server gets our keys again
    pub fn resume(&mut self, now: Instant) {
        self.timestep.resume(now);
        self.sampler.mark_dirty();
    }

    /// One scheduler invocation: due ticks flush input to `sink`, then at
    /// most one frame is drawn to `canvas`
    pub fn step<S, C>(&mut self, now: Instant, sink: &mut S, canvas: &mut C) -> io::Result<StepReport>
    where
        S: InputSink + ?Sized,
        C: Canvas + ?Sized,
    {
        let mut frame = Frame {
            game: &self.game,
            sampler: &mut self.sampler,
            sink,
            canvas,
            sent: 0,
            render_error: None,
        };
        let report = self.timestep.step(now, &mut frame);
        self.inputs_sent += frame.sent;

        match frame.render_error {
            Some(e) => Err(e),
            None => Ok(report),
        }
    }
}

/// Borrowed view handed to the scheduler for one invocation
struct Frame<'a, S: ?Sized, C: ?Sized> {
    game: &'a GameState,
    sampler: &'a mut InputSampler,
    sink: &'a mut S,
    canvas: &'a mut C,
    sent: u64,
    render_error: Option<io::Error>,
}

impl<S, C> Simulation for Frame<'_, S, C>
where
    S: InputSink + ?Sized,
    C: Canvas + ?Sized,
{
    fn update(&mut self) {
        if self.sampler.take_dirty() {
            let input = self.sampler.current();
            self.sink.send_input(&input);
            self.sent += 1;
            debug!(?input, "Sent input");
        }
    }

    fn render(&mut self) {
        if let Err(e) = render_frame(self.game, self.canvas) {
            self.render_error = Some(e);
        }
    }
}
