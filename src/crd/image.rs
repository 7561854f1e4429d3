//! Image Custom Resource Definition
//!
//! An Image declares the artifact to build and the Builder to build it with.
//! The controller answers by creating at most one new Build whenever the
//! Image's generation or the Builder's generation has advanced past what the
//! last recorded Build reflects.

use std::collections::BTreeMap;

use kube::api::ObjectMeta;
use kube::{CustomResource, Resource, ResourceExt};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::build::{Build, BuildSpec, BUILD_NUMBER_LABEL, IMAGE_NAME_LABEL};
use super::builder::Builder;
use super::types::{Condition, SourceConfig};

#[derive(CustomResource, Clone, Debug, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "kiln.build",
    version = "v1alpha1",
    kind = "Image",
    namespaced,
    status = "ImageStatus",
    shortname = "img",
    printcolumn = r#"{"name":"Tag","type":"string","jsonPath":".spec.tag"}"#,
    printcolumn = r#"{"name":"Builder","type":"string","jsonPath":".spec.builderRef"}"#,
    printcolumn = r#"{"name":"LastBuild","type":"string","jsonPath":".status.lastBuildRef"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ImageSpec {
    /// Destination reference the finished artifact is pushed to
    pub tag: String,

    /// Name of the Builder (same namespace) providing the build environment
    pub builder_ref: String,

    /// Source to build
    #[serde(default)]
    pub source: SourceConfig,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImageStatus {
    /// Number of builds ever created for this Image
    #[serde(default)]
    pub build_counter: i64,

    /// Name of the most recent Build created for this Image. Once set, it
    /// refers to the Build whose build-number label is `build_counter - 1`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_build_ref: Option<String>,

    /// Spec generation last successfully reconciled
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}

impl Image {
    /// Count of builds ever created, zero for a fresh Image
    pub fn build_counter(&self) -> i64 {
        self.status.as_ref().map_or(0, |s| s.build_counter)
    }

    /// Whether a new Build must be started. True when no current Build
    /// exists, or when the Image or its Builder has moved ahead of what the
    /// current Build reflects. Callers short-circuit on a running Build
    /// before consulting this, so a positive answer never duplicates an
    /// in-flight build.
    pub fn build_needed(&self, current: Option<&Build>, builder: &Builder) -> bool {
        current.map_or(true, |build| self.is_stale(build, builder))
    }

    fn is_stale(&self, build: &Build, builder: &Builder) -> bool {
        self.metadata.generation.unwrap_or(0) != build.spec.image_generation
            || builder.metadata.generation.unwrap_or(0) > build.spec.builder_generation
    }

    /// Construct the next Build for this Image. The ordinal label carries the
    /// current build counter (pre-increment); the deterministic name makes a
    /// racing duplicate create fail at the API server instead of producing
    /// two builds for one slot.
    pub fn next_build(&self, builder: &Builder) -> Build {
        let ordinal = self.build_counter();
        let name = format!("{}-build-{}", self.name_any(), ordinal + 1);

        let mut labels = BTreeMap::new();
        labels.insert(BUILD_NUMBER_LABEL.to_string(), ordinal.to_string());
        labels.insert(IMAGE_NAME_LABEL.to_string(), self.name_any());

        Build {
            metadata: ObjectMeta {
                name: Some(name),
                namespace: self.namespace(),
                labels: Some(labels),
                owner_references: self.controller_owner_ref(&()).map(|r| vec![r]),
                ..Default::default()
            },
            spec: BuildSpec {
                tag: self.spec.tag.clone(),
                builder_image: builder.spec.image.clone(),
                source: self.spec.source.clone(),
                image_generation: self.metadata.generation.unwrap_or(0),
                builder_generation: builder.metadata.generation.unwrap_or(0),
            },
            status: None,
        }
    }
}
