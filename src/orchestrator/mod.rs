//! Application-level orchestration.
//!
//! This module owns request execution: UI and CLI layers hand it tickets issued by the
//! session and receive completions back as events, keeping network work off the thread
//! that owns session state.

mod controller;

pub(crate) use controller::{download_to, run_controller};
