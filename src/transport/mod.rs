//! TCP transport
//!
//! Owns the listening socket and runs one request/response exchange per connection.

pub mod framing;
pub mod server;
