mod media_transport;
mod transport_config;
mod transport_event;
mod webrtc_transport;

pub use media_transport::*;
pub use transport_config::TransportConfig;
pub use transport_event::*;
pub use webrtc_transport::{WebRtcTransport, WebRtcTransportFactory};
