//! Transient HTTP endpoints serving one session's selected file.

mod range;
mod server;

pub use range::{content_type_for_path, parse_range_header, ByteRange, RangeError};
pub use server::{StreamEndpoint, StreamEndpointServer, StreamError, StreamSource};
