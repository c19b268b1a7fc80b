//! HTTP collaborators: credential values, content-type decoding and the
//! transport boundary.

mod auth;
pub mod decode;
mod transport;

pub use auth::Auth;
pub use transport::{HttpTransport, Transport, TransportResponse};
