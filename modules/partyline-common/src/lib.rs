pub mod types;
pub mod limits;
pub mod config;
pub mod error;

pub use types::*;
pub use limits::*;
pub use config::Config;
pub use error::{PartylineError, SnapshotViolation, UnknownPillar};
