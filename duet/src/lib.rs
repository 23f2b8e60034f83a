pub use duet_core::model::{PeerId, Role, RoomId};
pub use duet_core::{ConnectionError, PermissionError, SignalingError};

pub mod model {
    pub use duet_core::model::*;
}

pub mod utils {
    pub use duet_core::utils::*;
}

#[cfg(feature = "peer")]
pub mod peer {
    pub use duet_peer::*;
}

#[cfg(feature = "server")]
pub mod server {
    pub use duet_server::*;
}
