pub mod error;
pub mod model;
pub mod utils;

pub use error::{ConnectionError, PermissionError, SignalingError};
pub use model::*;
