//! Build Custom Resource Definition
//!
//! A Build is an immutable record of one build attempt for an Image. The
//! Image controller creates it exactly once per triggering decision; a
//! separate build-execution controller moves its phase to a terminal state.

use kube::CustomResource;
use kube::ResourceExt;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::types::SourceConfig;

/// Label carrying the build ordinal for an Image's build sequence
pub const BUILD_NUMBER_LABEL: &str = "kiln.build/build-number";

/// Label naming the Image a Build belongs to
pub const IMAGE_NAME_LABEL: &str = "kiln.build/image-name";

#[derive(CustomResource, Clone, Debug, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "kiln.build",
    version = "v1alpha1",
    kind = "Build",
    namespaced,
    status = "BuildStatus",
    printcolumn = r#"{"name":"Tag","type":"string","jsonPath":".spec.tag"}"#,
    printcolumn = r#"{"name":"Phase","type":"string","jsonPath":".status.phase"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct BuildSpec {
    /// Destination reference for the built artifact
    pub tag: String,

    /// Builder image providing the build environment
    pub builder_image: String,

    /// Source snapshot this build was cut from
    #[serde(default)]
    pub source: SourceConfig,

    /// Image spec generation observed when this build was cut
    #[serde(default)]
    pub image_generation: i64,

    /// Builder generation observed when this build was cut
    #[serde(default)]
    pub builder_generation: i64,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BuildStatus {
    #[serde(default)]
    pub phase: BuildPhase,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub enum BuildPhase {
    #[default]
    Pending,
    Running,
    Succeeded,
    Failed,
}

impl Build {
    /// Whether this build still occupies the in-flight slot for its Image.
    /// A build the executor has not touched yet (no status) counts as
    /// running; only a terminal phase frees the slot.
    pub fn is_running(&self) -> bool {
        self.status.as_ref().map_or(true, |s| {
            matches!(s.phase, BuildPhase::Pending | BuildPhase::Running)
        })
    }

    /// Ordinal from the build-number label, if present and well-formed
    pub fn build_number(&self) -> Option<i64> {
        self.labels()
            .get(BUILD_NUMBER_LABEL)
            .and_then(|v| v.parse().ok())
    }
}
