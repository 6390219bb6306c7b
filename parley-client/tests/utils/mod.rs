pub mod mock_transport;
pub mod signal_helpers;

pub use local_server::*;
pub use mock_transport::*;
pub use signal_helpers::*;
