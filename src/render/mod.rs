//! Frame composition. Drawing primitives live behind [`Canvas`]; this module
//! only decides what is drawn and in which order.

pub mod terminal;

use std::io;

use crate::game::{CellType, Coords, Direction, Edges, GameState, MapDimensions};

pub use terminal::{TerminalCanvas, TerminalGuard};

/// A drawing surface sized to the map
pub trait Canvas {
    /// Wipe the whole surface
    fn clear(&mut self);

    fn draw_background(&mut self, dimensions: MapDimensions);

    fn draw_floor(&mut self, at: Coords, cell_type: CellType);

    fn draw_walls(&mut self, at: Coords, edges: Edges);

    fn draw_player(&mut self, at: Coords, facing: Direction);

    fn draw_peer(&mut self, at: Coords);

    /// Push the composed frame to the output
    fn present(&mut self) -> io::Result<()>;
}

/// Draw one full frame of `state`.
///
/// Walls go after every floor so a neighbour's fill never covers a wall
/// stroke; the local player goes before peers so peer markers stay visible.
pub fn render_frame<C: Canvas + ?Sized>(state: &GameState, canvas: &mut C) -> io::Result<()> {
    let dimensions = state.dimensions();

    canvas.clear();
    canvas.draw_background(dimensions);

    for cell in state.discovered_cells() {
        canvas.draw_floor(dimensions.coords_of(cell.index), cell.cell_type);
    }
    for cell in state.discovered_cells() {
        canvas.draw_walls(dimensions.coords_of(cell.index), cell.edges);
    }

    canvas.draw_player(state.player_position, state.player_direction);
    for (_, at) in state.other_players() {
        canvas.draw_peer(at);
    }

    canvas.present()
}
