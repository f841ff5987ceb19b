//! Helpers shared by the driver modules.

pub mod tls;

pub use tls::{SslMode, TlsBuilder};
