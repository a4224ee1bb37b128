//! Client-side view of the world

use std::collections::{BTreeMap, HashMap};

use super::map::{Cell, Coords, Direction, MapDimensions};

/// Everything the client knows about the map and the players on it
#[derive(Debug, Clone)]
pub struct GameState {
    dimensions: MapDimensions,
    pub player_position: Coords,
    pub player_direction: Direction,
    /// Revealed tiles keyed by row-major index. Entries are replaced, never removed.
    discovered_cells: BTreeMap<usize, Cell>,
    /// Peer positions keyed by server player id
    other_players: HashMap<String, Coords>,
}

/// An update that does not fit the session's map
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OutOfBounds {
    #[error("cell index {index} outside {width}x{height} map")]
    Cell { index: usize, width: usize, height: usize },

    #[error("position {coords} outside {width}x{height} map")]
    Position { coords: Coords, width: usize, height: usize },
}

impl GameState {
    pub fn new(dimensions: MapDimensions, player_position: Coords, player_direction: Direction) -> Self {
        Self {
            dimensions,
            player_position,
            player_direction,
            discovered_cells: BTreeMap::new(),
            other_players: HashMap::new(),
        }
    }

    pub fn dimensions(&self) -> MapDimensions {
        self.dimensions
    }

    /// Insert or replace a revealed tile
    pub fn upsert_cell(&mut self, cell: Cell) -> Result<(), OutOfBounds> {
        if !self.dimensions.contains_index(cell.index) {
            return Err(OutOfBounds::Cell {
                index: cell.index,
                width: self.dimensions.width(),
                height: self.dimensions.height(),
            });
        }
        self.discovered_cells.insert(cell.index, cell);
        Ok(())
    }

    fn check_position(&self, coords: Coords) -> Result<(), OutOfBounds> {
        if self.dimensions.contains(coords) {
            Ok(())
        } else {
            Err(OutOfBounds::Position {
                coords,
                width: self.dimensions.width(),
                height: self.dimensions.height(),
            })
        }
    }

    #[cfg(test)]
    pub fn cell(&self, index: usize) -> Option<&Cell> {
        self.discovered_cells.get(&index)
    }

    /// Revealed tiles in ascending index order
    pub fn discovered_cells(&self) -> impl Iterator<Item = &Cell> {
        self.discovered_cells.values()
    }

    pub fn discovered_count(&self) -> usize {
        self.discovered_cells.len()
    }

    /// Move the local player; positions off the map are refused
    pub fn move_player(&mut self, coords: Coords, direction: Direction) -> Result<(), OutOfBounds> {
        self.check_position(coords)?;
        self.player_position = coords;
        self.player_direction = direction;
        Ok(())
    }

    pub fn upsert_peer(&mut self, id: String, coords: Coords) -> Result<(), OutOfBounds> {
        self.check_position(coords)?;
        self.other_players.insert(id, coords);
        Ok(())
    }

    pub fn other_players(&self) -> impl Iterator<Item = (&str, Coords)> {
        self.other_players.iter().map(|(id, coords)| (id.as_str(), *coords))
    }

    #[cfg(test)]
    pub fn peer(&self, id: &str) -> Option<Coords> {
        self.other_players.get(id).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::map::{CellType, Edges};

    fn cell(index: usize, cell_type: CellType) -> Cell {
        Cell {
            index,
            cell_type,
            edges: Edges::default(),
        }
    }

    fn state() -> GameState {
        GameState::new(MapDimensions::new(4, 3).unwrap(), Coords::new(0, 0), Direction::North)
    }

    #[test]
    fn cells_replace_by_index() {
        let mut state = state();
        state.upsert_cell(cell(5, CellType::Soil)).unwrap();
        state.upsert_cell(cell(5, CellType::Plant)).unwrap();

        assert_eq!(state.discovered_count(), 1);
        assert_eq!(state.cell(5).unwrap().cell_type, CellType::Plant);
    }

    #[test]
    fn out_of_range_cell_is_rejected() {
        let mut state = state();
        let err = state.upsert_cell(cell(12, CellType::Soil)).unwrap_err();

        assert_eq!(err, OutOfBounds::Cell { index: 12, width: 4, height: 3 });
        assert_eq!(state.discovered_count(), 0);
    }

    #[test]
    fn off_map_positions_are_refused() {
        let mut state = state();

        let err = state
            .move_player(Coords::new(usize::MAX, 0), Direction::East)
            .unwrap_err();
        assert_eq!(
            err,
            OutOfBounds::Position { coords: Coords::new(usize::MAX, 0), width: 4, height: 3 }
        );
        assert_eq!(state.player_position, Coords::new(0, 0));
        assert_eq!(state.player_direction, Direction::North);

        assert!(state.upsert_peer("bob".into(), Coords::new(0, 3)).is_err());
        assert_eq!(state.other_players().count(), 0);

        state.move_player(Coords::new(3, 2), Direction::South).unwrap();
        assert_eq!(state.player_position, Coords::new(3, 2));
    }

    #[test]
    fn discovered_cells_iterate_in_index_order() {
        let mut state = state();
        for index in [7, 1, 11, 0] {
            state.upsert_cell(cell(index, CellType::Soil)).unwrap();
        }
        let order: Vec<usize> = state.discovered_cells().map(|c| c.index).collect();
        assert_eq!(order, vec![0, 1, 7, 11]);
    }
}
