// Simulation server access: wire format, HTTP client and the polling loops.

pub mod client;
pub mod error;
pub mod poller;
pub mod wire;

pub use client::SimClient;
pub use poller::{Feed, FeedEvent, PollerSettings};
