mod board;
pub mod error;
mod messaging;
mod sensor;
pub mod threshold;

pub use board::*;
pub use messaging::*;
pub use sensor::*;

pub static CORE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Viewer identities are the numeric user ids of the relationship store
pub type ViewerId = i32;
