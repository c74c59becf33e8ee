mod signaling_channel;
#[cfg(feature = "ws")]
mod ws_channel;

pub use signaling_channel::*;
#[cfg(feature = "ws")]
pub use ws_channel::*;
