pub mod diagnostics;
pub mod engine;
pub mod metrics;
pub mod mixer;
pub mod queue;
pub mod rate_limit;

mod registry;

pub use diagnostics::*;
pub use engine::*;
pub use metrics::*;
pub use mixer::{clip, note_to_freq};
pub use queue::*;
pub use rate_limit::*;
