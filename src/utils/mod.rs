pub mod error;
pub mod request_id;
pub mod signature;

pub use error::*;
pub use request_id::*;
pub use signature::*;
