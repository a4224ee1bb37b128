//! Game model: map geometry, client-side state, input and the tick scheduler

pub mod input;
pub mod map;
pub mod scheduler;
pub mod state;

pub use input::{InputSampler, InputVector};
pub use map::{Cell, CellType, Coords, Direction, Edges, MapDimensions};
pub use scheduler::{FixedTimestep, Simulation, StepReport};
pub use state::GameState;
