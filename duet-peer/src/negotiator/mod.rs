mod negotiator_error;
mod negotiator_event;
mod session_negotiator;

pub use negotiator_error::*;
pub use negotiator_event::*;
pub use session_negotiator::*;
