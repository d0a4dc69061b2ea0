//! JSON-RPC protocol handling
//!
//! Decoding, dispatch and encoding of single request/response exchanges.

pub mod dispatch;
pub mod request;
pub mod response;
