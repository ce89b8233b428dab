pub mod bridge;
pub mod config;
pub mod errors;
pub mod frame;
pub mod protocol;
pub mod runtime;

pub use bridge::*;
pub use config::*;
pub use errors::*;
pub use frame::*;
pub use protocol::*;
pub use runtime::*;
