pub mod config;
pub mod error;
pub mod events;
pub mod types;

pub use config::RedQueenConfig;
pub use error::{RedQueenError, Result};
pub use events::ChatEvent;
pub use types::*;
