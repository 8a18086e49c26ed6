pub mod config_manager;
pub mod error;
pub mod language;

pub use config_manager::*;
pub use error::*;
pub use language::*;
