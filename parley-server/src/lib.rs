pub mod app;
pub mod auth;
pub mod config;
pub mod error;
pub mod room;
pub mod signaling;

pub use app::*;
pub use auth::*;
pub use config::{DEFAULT_PING_INTERVAL, ServerConfig};
pub use error::*;
pub use room::*;
pub use signaling::*;
