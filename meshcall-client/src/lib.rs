//! Signaling-driven connection lifecycle for full-mesh media rooms.
//!
//! One [`MeshOrchestrator`] task owns every negotiation session of a room.
//! Callers talk to it through a cloneable [`MeshHandle`] and observe
//! [`MeshEvent`]s through a broadcast subscription.

pub mod config;
pub mod error;
pub mod event;
pub mod media;
pub mod room;
pub mod session;
pub mod signaling;
pub mod transport;

pub use config::*;
pub use error::*;
pub use event::*;
pub use media::*;
pub use room::*;
pub use session::*;
pub use signaling::*;
pub use transport::*;
