pub mod constants;
pub mod enums;
pub mod errors;
pub mod protocol;
pub mod validate;

pub use constants::*;
pub use enums::*;
pub use errors::*;
pub use protocol::*;
pub use validate::*;
