//! Builder Custom Resource Definition
//!
//! A Builder names the base build environment Images reference. It is owned
//! and mutated entirely outside this operator; a bump of its generation is a
//! valid trigger for a new Build on every Image that references it.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(CustomResource, Clone, Debug, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "kiln.build",
    version = "v1alpha1",
    kind = "Builder",
    namespaced,
    status = "BuilderStatus",
    shortname = "bldr",
    printcolumn = r#"{"name":"Image","type":"string","jsonPath":".spec.image"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct BuilderSpec {
    /// Builder image providing the build environment
    pub image: String,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BuilderStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest_image: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
}
