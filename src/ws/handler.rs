//! Connection handler: the WebSocket to the game server and the
//! application of its pushes to the game state

use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use reqwest::Url;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, trace, warn};

use crate::game::{GameState, InputVector};
use crate::ws::protocol::{self, PlayerRecord, ServerMsg};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Destination for flushed input vectors
pub trait InputSink {
    /// Queue one input vector. Delivery is not confirmed.
    fn send_input(&mut self, input: &InputVector);
}

/// How `player_update` records are assigned to players
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerRouting {
    /// The first record is the local player; the rest are dropped
    FirstRecord,
    /// Records are matched to the local player by user id; others are peers
    ByUserId(String),
}

/// Counters for inbound traffic
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InboundStats {
    pub cell_updates: u64,
    pub player_updates: u64,
    pub unknown: u64,
    pub malformed: u64,
    pub rejected_cells: u64,
    pub rejected_players: u64,
}

/// What a single inbound frame did to the state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Cells(usize),
    Players,
    Ignored,
}

/// Decodes server pushes and merges them into the game state
#[derive(Debug)]
pub struct MessageHandler {
    routing: PlayerRouting,
    stats: InboundStats,
}

impl MessageHandler {
    pub fn new(routing: PlayerRouting) -> Self {
        Self {
            routing,
            stats: InboundStats::default(),
        }
    }

    pub fn stats(&self) -> InboundStats {
        self.stats
    }

    /// Handle one text frame
    pub fn handle_text(&mut self, state: &mut GameState, text: &str) -> Applied {
        if text.trim() == "ping" {
            return Applied::Ignored;
        }

        match protocol::decode(text) {
            Ok(msg) => self.apply(state, msg, text),
            Err(e) => {
                self.stats.malformed += 1;
                warn!(error = %e, malformed = self.stats.malformed, "Dropping malformed server message");
                Applied::Ignored
            }
        }
    }

    fn apply(&mut self, state: &mut GameState, msg: ServerMsg, raw: &str) -> Applied {
        match msg {
            ServerMsg::CellUpdate { cells } => {
                self.stats.cell_updates += 1;
                let mut stored = 0;
                for cell in cells {
                    match state.upsert_cell(cell) {
                        Ok(()) => stored += 1,
                        Err(e) => {
                            self.stats.rejected_cells += 1;
                            warn!(error = %e, "Rejecting cell update");
                        }
                    }
                }
                trace!(stored, "Applied cell update");
                Applied::Cells(stored)
            }
            ServerMsg::PlayerUpdate { players } => {
                self.stats.player_updates += 1;
                self.apply_players(state, players);
                Applied::Players
            }
            ServerMsg::Unknown => {
                self.stats.unknown += 1;
                let kind = protocol::discriminator_of(raw);
                warn!(
                    kind = kind.as_deref().unwrap_or("?"),
                    unknown = self.stats.unknown,
                    "Ignoring server message with unknown type"
                );
                Applied::Ignored
            }
        }
    }

    fn apply_players(&mut self, state: &mut GameState, players: Vec<PlayerRecord>) {
        let mut rejected = Vec::new();
        match &self.routing {
            PlayerRouting::FirstRecord => {
                let dropped = players.len().saturating_sub(1);
                if let Some(first) = players.into_iter().next() {
                    rejected.extend(state.move_player(first.coords, first.direction).err());
                }
                if dropped > 0 {
                    trace!(dropped, "Discarding player records after the first");
                }
            }
            PlayerRouting::ByUserId(own_id) => {
                let mut local_seen = false;
                for (position, record) in players.into_iter().enumerate() {
                    let result = match record.user_id {
                        Some(id) if id == *own_id => {
                            local_seen = true;
                            state.move_player(record.coords, record.direction)
                        }
                        Some(id) => state.upsert_peer(id, record.coords),
                        // Without ids, fall back to the first record being us
                        None if position == 0 && !local_seen => {
                            state.move_player(record.coords, record.direction)
                        }
                        None => {
                            trace!("Discarding player record without user id");
                            Ok(())
                        }
                    };
                    rejected.extend(result.err());
                }
            }
        }

        for e in rejected {
            self.stats.rejected_players += 1;
            warn!(error = %e, "Rejecting player record");
        }
    }
}

/// An open WebSocket to the game server
pub struct Connection {
    outbound: mpsc::UnboundedSender<Message>,
    inbound: SplitStream<Socket>,
    writer: JoinHandle<()>,
}

/// An inbound event that matters to the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Text(String),
    Closed(Option<String>),
}

impl Connection {
    /// Open the socket and start the writer task
    pub async fn connect(url: &Url) -> Result<Self, ConnectionError> {
        let (socket, _response) = connect_async(url.as_str())
            .await
            .map_err(|e| ConnectionError::Connect(Box::new(e)))?;
        info!(url = %url, "WebSocket connected");

        let (sink, inbound) = socket.split();
        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        let writer = tokio::spawn(run_writer(sink, outbound_rx));

        Ok(Self {
            outbound,
            inbound,
            writer,
        })
    }

    /// Queue an input vector for transmission
    pub fn send(&self, input: &InputVector) {
        match serde_json::to_string(input) {
            Ok(json) => {
                if self.outbound.send(Message::Text(json)).is_err() {
                    debug!("Writer task gone, input dropped");
                }
            }
            Err(e) => debug!(error = %e, "Failed to serialize input"),
        }
    }

    /// Wait for the next text frame or the end of the connection
    pub async fn recv(&mut self) -> Inbound {
        while let Some(result) = self.inbound.next().await {
            match result {
                Ok(Message::Text(text)) => return Inbound::Text(text),
                Ok(Message::Binary(bytes)) => {
                    warn!(len = bytes.len(), "Received binary message, ignoring");
                }
                Ok(Message::Ping(_)) | Ok(Message::Pong(_)) | Ok(Message::Frame(_)) => {
                    trace!("Control frame");
                }
                Ok(Message::Close(frame)) => {
                    return Inbound::Closed(frame.map(|f| f.reason.into_owned()));
                }
                Err(e) => return Inbound::Closed(Some(e.to_string())),
            }
        }
        Inbound::Closed(None)
    }
}

impl InputSink for Connection {
    fn send_input(&mut self, input: &InputVector) {
        self.send(input);
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.writer.abort();
    }
}

/// Drain queued messages into the socket until either side goes away
async fn run_writer(mut sink: SplitSink<Socket, Message>, mut rx: mpsc::UnboundedReceiver<Message>) {
    while let Some(msg) = rx.recv().await {
        if let Err(e) = sink.send(msg).await {
            debug!(error = %e, "WebSocket send failed");
            break;
        }
    }
    let _ = sink.close().await;
}

/// Connection errors
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("WebSocket connect failed: {0}")]
    Connect(#[source] Box<tokio_tungstenite::tungstenite::Error>),

    #[error("WebSocket connect timed out after {0:?}")]
    Timeout(std::time::Duration),
}
