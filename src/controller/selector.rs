//! Build selection for an Image
//!
//! Finds the Build that corresponds to the Image's recorded build counter and
//! checks that the recorded status agrees with what is actually stored. The
//! selector never mutates state and is safe to call repeatedly.

use kube::api::{Api, ListParams};
use kube::ResourceExt;

use crate::crd::{Build, Image, IMAGE_NAME_LABEL};
use crate::error::{Error, Result};

/// Floor for the ordinal query: the ordinal of the build the status claims to
/// have recorded last, clamped so a fresh Image (counter 0) queries from 0.
/// Distinct from the ordinal stamped on a newly created Build, which is the
/// counter itself.
pub fn current_ordinal(image: &Image) -> i64 {
    (image.build_counter() - 1).max(0)
}

/// Label selector for all Builds belonging to an Image. The label selector
/// grammar has no ordering operator, so the `build-number > floor` half of
/// the query is applied client-side in [`select_current`]. Greater-than
/// rather than equals-floor-plus-one, to tolerate externally created builds
/// with skipped ordinals.
pub fn image_build_selector(image: &Image) -> String {
    format!("{}={}", IMAGE_NAME_LABEL, image.name_any())
}

/// Pure half of the selector: apply the ordinal filter and the result policy.
///
/// Zero candidates means no build exists for the next slot. Exactly one
/// candidate must be the build the status recorded; anything else (a
/// mismatched name, or duplicate builds above the floor) means the status
/// disagrees with the store's ground truth, e.g. after a crashed partial
/// update, and surfaces as [`Error::StatusOutOfSync`].
pub fn select_current(builds: Vec<Build>, image: &Image) -> Result<Option<Build>> {
    let floor = current_ordinal(image);
    let mut candidates: Vec<Build> = builds
        .into_iter()
        .filter(|b| b.build_number().map_or(false, |n| n > floor))
        .collect();

    match candidates.len() {
        0 => Ok(None),
        1 => {
            let build = candidates.remove(0);
            let build_name = build.name_any();
            let recorded = image
                .status
                .as_ref()
                .and_then(|s| s.last_build_ref.as_deref());

            if recorded == Some(build_name.as_str()) {
                Ok(Some(build))
            } else {
                Err(Error::StatusOutOfSync {
                    namespace: image.namespace().unwrap_or_default(),
                    name: image.name_any(),
                    reason: format!(
                        "selected build {} but status records {:?}",
                        build_name, recorded
                    ),
                })
            }
        }
        n => Err(Error::StatusOutOfSync {
            namespace: image.namespace().unwrap_or_default(),
            name: image.name_any(),
            reason: format!("{} builds found above ordinal {}", n, floor),
        }),
    }
}

/// Fetch the Build currently corresponding to the Image's recorded state
pub async fn fetch_current_build(builds: &Api<Build>, image: &Image) -> Result<Option<Build>> {
    let params = ListParams::default().labels(&image_build_selector(image));
    let listed = builds.list(&params).await.map_err(Error::KubeError)?;
    select_current(listed.items, image)
}
