mod credential;
mod jwt;
mod token_handler;

pub use credential::*;
pub use jwt::*;
pub use token_handler::*;
