mod rendezvous_channel;
mod ws_channel;

pub use rendezvous_channel::*;
pub use ws_channel::*;
