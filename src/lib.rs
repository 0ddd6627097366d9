pub mod cascade;
pub mod cli;
pub mod command;
pub mod error;
pub mod event;
pub mod forge;
pub mod orchestrator;
pub mod router;
pub mod server;
pub mod version;
pub mod worker;

pub use cli::Args;
pub use command::serve::execute as serve;
pub use error::{CascadeError, Result};
