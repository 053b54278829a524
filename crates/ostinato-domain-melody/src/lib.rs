pub mod model;
pub mod player;

pub use model::*;
pub use player::*;
