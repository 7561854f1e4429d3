//! Controller module for Image reconciliation
//!
//! Contains the controller loop, the build selector, and the dependency
//! tracker that maps Builder changes back onto the Images that use them.

pub mod conditions;
mod reconciler;
pub mod selector;
pub mod tracker;

pub use reconciler::{run_controller, ControllerState};
pub use selector::{current_ordinal, fetch_current_build};
pub use tracker::{Tracker, DEFAULT_TRACK_TTL};
