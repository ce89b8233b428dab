pub mod errors;
pub mod file;
pub mod memory;
pub mod settings;
pub mod store;

pub use errors::*;
pub use file::*;
pub use memory::*;
pub use settings::*;
pub use store::*;
