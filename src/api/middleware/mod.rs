mod auth;
mod logging;

pub use auth::{bearer_auth, StaticTokens, TokenValidator};
pub use logging::request_logger;
