//! Wire types for the stdin/stdout protocol

pub mod request;
pub mod response;

pub use request::ClassifyRequest;
pub use response::ClassifyResponse;
