//! HTTP Adapter
//!
//! `reqwest` implementation of [`OverviewApi`](crate::application::ports::OverviewApi).

mod client;
mod error;

pub use client::{HttpChunkSource, HttpOverviewClient};
