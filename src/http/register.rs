//! Registration REST client

use std::collections::HashMap;

use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::game::{Cell, Coords, Direction, GameState, MapDimensions};
use crate::util::hash::username_hash;

/// Client for the server's `/register` endpoints
#[derive(Clone)]
pub struct RegistrationClient {
    client: Client,
    base_url: Url,
}

/// Registration request body
#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub user_id: u32,
}

/// Registration response as sent by the server
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterResponse {
    #[serde(default)]
    pub id: Option<String>,
    pub url: String,
    pub width: usize,
    pub height: usize,
    pub player_position: Coords,
    #[serde(default)]
    pub player_direction: Direction,
    #[serde(default)]
    pub explored_cells: ExploredCells,
}

/// Pre-explored cells, keyed by index or as a plain list
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ExploredCells {
    Keyed(HashMap<String, Cell>),
    Listed(Vec<Cell>),
}

impl Default for ExploredCells {
    fn default() -> Self {
        Self::Listed(Vec::new())
    }
}

impl ExploredCells {
    fn into_cells(self) -> Vec<Cell> {
        match self {
            Self::Keyed(map) => map.into_values().collect(),
            Self::Listed(cells) => cells,
        }
    }
}

/// A validated registration: everything needed to start a session
#[derive(Debug, Clone)]
pub struct Registration {
    /// Server-side connection id, used to unregister
    pub id: String,
    /// The registration hash of the username
    pub user_id: u32,
    /// WebSocket endpoint for this player
    pub socket_url: Url,
    pub dimensions: MapDimensions,
    pub player_position: Coords,
    pub player_direction: Direction,
    pub explored_cells: Vec<Cell>,
}

impl Registration {
    pub fn from_response(user_id: u32, response: RegisterResponse) -> Result<Self, RegisterError> {
        let dimensions = MapDimensions::new(response.width, response.height).ok_or(
            RegisterError::InvalidDimensions {
                width: response.width,
                height: response.height,
            },
        )?;

        if !dimensions.contains(response.player_position) {
            return Err(RegisterError::InvalidPosition {
                position: response.player_position,
                width: response.width,
                height: response.height,
            });
        }

        let socket_url =
            Url::parse(&response.url).map_err(|_| RegisterError::InvalidUrl(response.url.clone()))?;

        let id = match response.id {
            Some(id) => id,
            None => socket_url
                .path_segments()
                .and_then(|mut segments| segments.next_back())
                .filter(|segment| !segment.is_empty())
                .map(str::to_string)
                .ok_or_else(|| RegisterError::InvalidUrl(response.url.clone()))?,
        };

        Ok(Self {
            id,
            user_id,
            socket_url,
            dimensions,
            player_position: response.player_position,
            player_direction: response.player_direction,
            explored_cells: response.explored_cells.into_cells(),
        })
    }

    /// Build the initial game state from the registration snapshot
    pub fn seed_state(&self) -> GameState {
        let mut state = GameState::new(self.dimensions, self.player_position, self.player_direction);
        for cell in &self.explored_cells {
            if let Err(e) = state.upsert_cell(cell.clone()) {
                warn!(error = %e, "Dropping explored cell from registration");
            }
        }
        state
    }
}

impl RegistrationClient {
    pub fn new(base_url: Url) -> Self {
        Self {
            client: Client::new(),
            base_url,
        }
    }

    fn register_url(&self) -> Result<Url, RegisterError> {
        self.base_url
            .join("register")
            .map_err(|_| RegisterError::InvalidUrl(self.base_url.to_string()))
    }

    /// Register a player by name and return the session seed
    pub async fn register(&self, player_name: &str) -> Result<Registration, RegisterError> {
        let user_id = username_hash(player_name);
        let url = self.register_url()?;
        debug!(user_id, url = %url, "Registering player");

        let response = self
            .client
            .post(url)
            .header("Content-Type", "application/json")
            .json(&RegisterRequest { user_id })
            .send()
            .await
            .map_err(RegisterError::Request)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(RegisterError::Api { status: status.as_u16(), body });
        }

        let body: RegisterResponse = response.json().await.map_err(RegisterError::Parse)?;
        Registration::from_response(user_id, body)
    }

    /// Remove the server-side registration
    pub async fn unregister(&self, id: &str) -> Result<(), RegisterError> {
        let url = self
            .base_url
            .join(&format!("register/{id}"))
            .map_err(|_| RegisterError::InvalidUrl(self.base_url.to_string()))?;

        let response = self
            .client
            .delete(url)
            .send()
            .await
            .map_err(RegisterError::Request)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(RegisterError::Api { status: status.as_u16(), body });
        }

        Ok(())
    }
}

/// Registration errors
#[derive(Debug, thiserror::Error)]
pub enum RegisterError {
    #[error("HTTP request failed: {0}")]
    Request(reqwest::Error),

    #[error("API error (status {status}): {body}")]
    Api { status: u16, body: String },

    #[error("Failed to parse response: {0}")]
    Parse(reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid map dimensions {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("Starting position {position} outside {width}x{height} map")]
    InvalidPosition { position: Coords, width: usize, height: usize },
}
