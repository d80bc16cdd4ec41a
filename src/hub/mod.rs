//! Hub cluster access.

pub mod client;

pub use client::{HubClient, HubConfig};
