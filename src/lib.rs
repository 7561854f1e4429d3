//! kiln: a Kubernetes operator that turns Image declarations into Build runs
//!
//! An Image declares what to build and which Builder to build it with. The
//! controller creates at most one new Build whenever the Image or its Builder
//! moves ahead of the last recorded build, and tracks Builder references so a
//! Builder change re-triggers every Image that depends on it.

pub mod controller;
pub mod crd;
pub mod error;

pub use crate::error::{Error, Result};
