mod lobby;
mod lobby_command;
mod pairing;

pub use lobby::*;
pub use lobby_command::*;
pub use pairing::*;
