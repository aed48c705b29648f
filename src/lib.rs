//! attire-check library crate.
//!
//! Camera capture, local outfit classification, and the terminal UI
//! that ties them together. The binary in `main.rs` is a thin wrapper;
//! everything lives here so integration tests can reach it.

pub mod camera;
pub mod cli;
pub mod config;
pub mod event_loop;
pub mod input;
pub mod model;
pub mod preview;
pub mod session;
pub mod terminal;
