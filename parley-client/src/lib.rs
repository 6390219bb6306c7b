pub mod coordinator;
pub mod error;
pub mod signaling_client;
pub mod transport;

pub use coordinator::*;
pub use error::*;
pub use signaling_client::SignalingClient;
pub use transport::*;
