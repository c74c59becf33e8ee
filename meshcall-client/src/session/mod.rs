mod negotiation;
mod negotiation_session;
mod peer_registry;
mod session_worker;

pub use negotiation::*;
pub use negotiation_session::*;
pub use peer_registry::*;
pub(crate) use session_worker::*;
