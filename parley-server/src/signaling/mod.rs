mod router;
mod session;
mod ws_handler;

pub use router::*;
pub use session::*;
pub use ws_handler::*;
