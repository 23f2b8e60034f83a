mod config;
mod coordinator;
mod media;
mod negotiator;
mod participant;
mod rendezvous;
mod transport;

pub use config::*;
pub use coordinator::*;
pub use media::*;
pub use negotiator::*;
pub use participant::*;
pub use rendezvous::*;
pub use transport::*;
