pub use meshcall_core::model::{ParticipantId, RoomId};

pub mod model {
    pub use meshcall_core::model::*;
}

#[cfg(feature = "client")]
pub mod client {
    pub use meshcall_client::*;
}
