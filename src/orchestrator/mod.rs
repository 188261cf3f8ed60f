//! Application-level orchestration.
//!
//! Owns the panel command loop. UI and headless layers send `PanelCommand`s into it
//! and render the `PanelEvent`s it emits.

mod controller;

pub(crate) use controller::run_controller;
