pub mod config;
pub mod connection;
pub mod dedupe;
pub mod errors;
pub mod manager;
pub mod persistence;
pub mod processor;
pub mod quality;
pub mod scheduler;
pub mod state;

pub use config::*;
pub use connection::*;
pub use dedupe::*;
pub use errors::*;
pub use manager::*;
pub use persistence::*;
pub use processor::*;
pub use quality::*;
pub use scheduler::*;
pub use state::*;
