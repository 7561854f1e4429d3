//! Custom Resource Definitions for kiln
//!
//! Three kinds under the `kiln.build` API group: Image (user-declared desired
//! state), Build (one immutable build attempt), and Builder (externally
//! managed build environment configuration).

mod build;
mod builder;
mod image;
pub mod types;

#[cfg(test)]
mod tests;

pub use build::{
    Build, BuildPhase, BuildSpec, BuildStatus, BUILD_NUMBER_LABEL, IMAGE_NAME_LABEL,
};
pub use builder::{Builder, BuilderSpec, BuilderStatus};
pub use image::{Image, ImageSpec, ImageStatus};
pub use types::{Condition, GitSource, SourceConfig};
