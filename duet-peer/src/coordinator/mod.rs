mod coordinator_input;
mod coordinator_state;
mod signaling_coordinator;

pub use coordinator_input::*;
pub use coordinator_state::*;
pub use signaling_coordinator::*;
