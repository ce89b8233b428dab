pub mod client;
pub mod dto;
pub mod errors;
pub mod provider;

pub use client::*;
pub use dto::*;
pub use errors::*;
pub use provider::*;
