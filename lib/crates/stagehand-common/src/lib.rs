pub mod status;
pub mod types;

pub use status::derive_status;
pub use types::*;
