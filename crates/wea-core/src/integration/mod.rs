//! Integration layer - interfaces to collaborators outside the engine.

pub mod client;

pub use client::{BoxedClient, Client};
