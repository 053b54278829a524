pub mod audio;
pub mod control;
pub mod midi;
pub mod types;

pub use audio::*;
pub use control::*;
pub use midi::*;
pub use types::*;
