pub mod registry;
pub mod telegram;
pub mod types;

pub use registry::*;
pub use telegram::*;
pub use types::*;
