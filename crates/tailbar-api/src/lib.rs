// tailbar-api: Async Rust client for the Tailscale daemon's local API.

pub mod client;
pub mod error;
pub mod models;
pub mod patch;
pub mod stream;
pub mod transport;

pub use client::{Document, LocalClient};
pub use error::Error;
pub use patch::{PrefField, PrefsPatch};
pub use stream::DocumentStream;
pub use transport::TransportConfig;
