pub mod entities;
pub mod errors;
pub mod extraction;
pub mod ports;

pub use entities::*;
pub use errors::{DomainError, ErrorKind, Result};
pub use extraction::ContentExtractor;
