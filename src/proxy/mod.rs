//! Proxy module
//!
//! Builds the outbound request, sends it (with restart-and-retry for
//! supervised providers) and relays the response back.

pub mod forwarder;
pub mod headers;
pub mod logging;
pub mod relay;
pub mod transform;

pub use forwarder::{build_client, Forwarder, TransportError};
pub use logging::RequestContext;
pub use relay::relay_response;
pub use transform::{build_envelope, ForwardEnvelope};
