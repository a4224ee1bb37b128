//! WebSocket protocol message definitions
//! These are the wire types for client-server communication

use serde::{Deserialize, Deserializer, Serialize};

use crate::game::map::{Cell, Coords, Direction};

/// Messages pushed from server to client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMsg {
    /// Newly revealed or changed tiles
    CellUpdate {
        cells: Vec<Cell>,
    },

    /// Player positions
    PlayerUpdate {
        players: Vec<PlayerRecord>,
    },

    /// Any discriminator this client does not understand
    #[serde(other)]
    Unknown,
}

/// One player's position as reported by the server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub coords: Coords,
    pub direction: Direction,
    /// Server-side player key, when the server includes it
    #[serde(default, deserialize_with = "deserialize_player_id")]
    pub user_id: Option<String>,
}

/// The server keys players by the registration hash, sent either as a
/// string or as a bare number.
fn deserialize_player_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(u64),
    }

    Ok(Option::<RawId>::deserialize(deserializer)?.map(|raw| match raw {
        RawId::Text(text) => text,
        RawId::Number(n) => n.to_string(),
    }))
}

/// Only the discriminator, for logging messages we could not route
#[derive(Debug, Deserialize)]
struct Discriminator {
    #[serde(rename = "type")]
    kind: Option<String>,
}

/// Decode one text frame
pub fn decode(text: &str) -> Result<ServerMsg, serde_json::Error> {
    serde_json::from_str(text)
}

/// Best-effort extraction of the `type` field of a frame
pub fn discriminator_of(text: &str) -> Option<String> {
    serde_json::from_str::<Discriminator>(text)
        .ok()
        .and_then(|d| d.kind)
}
