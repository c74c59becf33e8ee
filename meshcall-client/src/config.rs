use meshcall_core::IceServerConfig;
use meshcall_core::utils::{DEFAULT_STUN_ADDR, DEFAULT_STUN_ADDR_2};
use std::time::Duration;

/// Configuration for every peer transport the mesh creates.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub ice_servers: Vec<IceServerConfig>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            ice_servers: vec![
                IceServerConfig::stun(DEFAULT_STUN_ADDR),
                IceServerConfig::stun(DEFAULT_STUN_ADDR_2),
            ],
        }
    }
}

#[derive(Debug, Clone)]
pub struct MeshConfig {
    pub transport: TransportConfig,
    /// Sessions not connected within this window are failed. `None` waits forever.
    pub negotiation_timeout: Option<Duration>,
    pub command_capacity: usize,
    pub transport_event_capacity: usize,
    pub event_capacity: usize,
}

impl MeshConfig {
    pub fn with_negotiation_timeout(mut self, timeout: Duration) -> Self {
        self.negotiation_timeout = Some(timeout);
        self
    }
}

impl Default for MeshConfig {
    fn default() -> Self {
        Self {
            transport: TransportConfig::default(),
            negotiation_timeout: None,
            command_capacity: 100,
            transport_event_capacity: 256,
            event_capacity: 64,
        }
    }
}
