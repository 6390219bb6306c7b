use parley_core::IceServerConfig;
use parley_core::utils::default_stun_urls;

/// ICE configuration handed to every transport the factory creates.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub ice_servers: Vec<IceServerConfig>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            ice_servers: vec![IceServerConfig {
                urls: default_stun_urls(),
                username: None,
                credential: None,
            }],
        }
    }
}
