//! Session driver: one cooperative loop multiplexing the socket, the
//! keyboard and the scheduler cadence

use std::future::Future;
use std::time::Instant;

use crossterm::event::{Event, EventStream};
use futures::StreamExt;
use reqwest::Url;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, trace, warn};

use super::keyboard::{KeyOutcome, Keyboard};
use super::reconnect::Reconnector;
use super::state::ClientState;
use crate::config::Config;
use crate::http::Registration;
use crate::render::{Canvas, TerminalCanvas};
use crate::util::backoff::Backoff;
use crate::util::time::Timer;
use crate::ws::{Applied, Connection, Inbound};

/// Why a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The player pressed a quit key
    Quit,
    /// Ctrl+C or SIGTERM
    Signal,
    /// The keyboard stream ended
    InputClosed,
}

/// A registered player's live session
pub struct Session {
    config: Config,
    player_name: String,
    socket_url: Url,
    client: ClientState,
    canvas: TerminalCanvas,
    keyboard: Keyboard,
}

impl Session {
    pub fn new(config: Config, registration: &Registration, key_release_events: bool) -> Self {
        let client = ClientState::new(&config, registration, Instant::now());
        let keyboard = Keyboard::new(key_release_events, config.key_hold);

        Self {
            player_name: config.player_name.clone(),
            socket_url: registration.socket_url.clone(),
            canvas: TerminalCanvas::stdout(registration.dimensions),
            client,
            keyboard,
            config,
        }
    }

    /// Run until quit, signal or end of keyboard input
    pub async fn run<F>(mut self, shutdown: F) -> anyhow::Result<SessionEnd>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        let backoff = Backoff::new(self.config.reconnect_base, self.config.reconnect_max);
        let mut reconnector = Reconnector::new(self.socket_url.clone(), backoff);
        let mut connection: Option<Connection> = None;
        self.client.pause();

        let mut keys = EventStream::new();
        let mut cadence = interval(self.config.scheduler_interval);
        cadence.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let end = loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown signal received");
                    break SessionEnd::Signal;
                }

                inbound = next_inbound(&mut connection) => match inbound {
                    Inbound::Text(text) => {
                        if let Applied::Cells(stored) = self.client.on_message(&text) {
                            trace!(stored, "Cells merged");
                        }
                    }
                    Inbound::Closed(reason) => {
                        warn!(reason = reason.as_deref().unwrap_or(""), "WebSocket closed, pausing tick loop");
                        connection = None;
                        self.client.pause();
                        reconnector.connection_lost();
                        self.show_status("disconnected, reconnecting")?;
                    }
                },

                result = reconnector.next(), if connection.is_none() => match result {
                    Ok(fresh) => {
                        info!(url = %self.socket_url, "Session connected");
                        connection = Some(fresh);
                        self.client.resume(Instant::now());
                        self.canvas.invalidate();
                    }
                    Err(e) => {
                        warn!(error = %e, attempt = reconnector.attempts(), "Connect failed");
                        self.show_status(&format!("disconnected, retry {}", reconnector.attempts()))?;
                    }
                },

                event = keys.next() => match event {
                    Some(Ok(Event::Key(key))) => {
                        if self.keyboard.handle(key, Instant::now(), &mut self.client.sampler) == KeyOutcome::Quit {
                            info!("Quit requested");
                            break SessionEnd::Quit;
                        }
                    }
                    Some(Ok(Event::Resize(cols, rows))) => {
                        debug!(cols, rows, "Terminal resized");
                        self.canvas.invalidate();
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        error!(error = %e, "Keyboard read failed");
                        break SessionEnd::InputClosed;
                    }
                    None => break SessionEnd::InputClosed,
                },

                _ = cadence.tick() => {
                    let now = Instant::now();
                    self.keyboard.tick(now, &mut self.client.sampler);

                    if let Some(connection) = connection.as_mut() {
                        let status = self.status_line();
                        self.canvas.set_status(status);

                        let timer = Timer::new();
                        let report = self.client.step(now, connection, &mut self.canvas)?;
                        if report.fell_behind {
                            debug!(
                                ticks = report.ticks_run,
                                rendered = report.rendered,
                                elapsed_us = timer.elapsed_micros(),
                                "Tick loop behind schedule"
                            );
                        }
                    }
                }
            }
        };

        let stats = self.client.inbound_stats();
        info!(
            ?end,
            ticks = self.client.total_ticks(),
            disconnected = self.client.is_paused(),
            inputs_sent = self.client.inputs_sent(),
            cell_updates = stats.cell_updates,
            player_updates = stats.player_updates,
            unknown = stats.unknown,
            malformed = stats.malformed,
            rejected_cells = stats.rejected_cells,
            rejected_players = stats.rejected_players,
            "Session ended"
        );
        Ok(end)
    }

    fn status_line(&self) -> String {
        let game = &self.client.game;
        format!(
            "{} at {} facing {:?} | {} cells discovered | Esc to quit",
            self.player_name,
            game.player_position,
            game.player_direction,
            game.discovered_count()
        )
    }

    /// Update the status line while the tick loop is paused
    fn show_status(&mut self, connection: &str) -> std::io::Result<()> {
        let status = format!("{} | {}", self.player_name, connection);
        self.canvas.set_status(status);
        self.canvas.present()
    }
}

/// Next inbound frame, or never while disconnected
async fn next_inbound(connection: &mut Option<Connection>) -> Inbound {
    match connection {
        Some(connection) => connection.recv().await,
        None => std::future::pending().await,
    }
}
