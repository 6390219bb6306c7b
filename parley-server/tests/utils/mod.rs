pub mod test_server;

pub use test_client::*;
pub use test_server::*;
