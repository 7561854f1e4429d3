//! Main reconciler for Image resources
//!
//! Implements the controller pattern using kube-rs runtime.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use kube::{
    api::{Api, PostParams},
    client::Client,
    runtime::{
        controller::{Action, Controller},
        reflector::ObjectRef,
        watcher::Config,
    },
    Resource, ResourceExt,
};
use tracing::{debug, error, info, instrument};

use crate::controller::conditions::{
    set_condition, CONDITION_STATUS_FALSE, CONDITION_STATUS_TRUE, CONDITION_TYPE_READY,
};
use crate::controller::selector::fetch_current_build;
use crate::controller::tracker::Tracker;
use crate::crd::{Build, Builder, Image, ImageStatus};
use crate::error::{Error, Result};

/// Shared state for the controller
pub struct ControllerState {
    pub client: Client,
    pub tracker: Arc<Tracker>,
    /// Namespace to watch; all namespaces when unset
    pub namespace: Option<String>,
}

fn scoped<K>(client: Client, namespace: Option<&str>) -> Api<K>
where
    K: Resource<Scope = k8s_openapi::NamespaceResourceScope>,
    K::DynamicType: Default,
{
    match namespace {
        Some(ns) => Api::namespaced(client, ns),
        None => Api::all(client),
    }
}

/// Main entry point to start the controller
pub async fn run_controller(state: Arc<ControllerState>) -> Result<()> {
    let client = state.client.clone();
    let namespace = state.namespace.as_deref();

    let images: Api<Image> = scoped(client.clone(), namespace);
    let builds: Api<Build> = scoped(client.clone(), namespace);
    let builders: Api<Builder> = scoped(client.clone(), namespace);

    info!("Starting Image controller");

    // Verify CRDs exist
    if let Err(e) = images.list(&Default::default()).await {
        error!("Image CRD not found. Please install the CRDs first: {:?}", e);
        return Err(Error::ConfigError("Image CRD not installed".to_string()));
    }

    let tracker = Arc::clone(&state.tracker);

    Controller::new(images, Config::default())
        // Builds are owned, so their status transitions re-enqueue the Image
        .owns(builds, Config::default())
        // Builders are referenced, not owned; the tracker maps their changes
        // back to the Images registered against them
        .watches(builders, Config::default(), move |builder| {
            tracker.tracking(&builder)
        })
        .shutdown_on_signal()
        .run(reconcile, error_policy, state)
        .for_each(|res| async move {
            match res {
                Ok(obj) => debug!("Reconciled: {:?}", obj),
                Err(e) => debug!("Reconcile failed: {:?}", e),
            }
        })
        .await;

    Ok(())
}

/// The main reconciliation function
///
/// Runs once per dequeued Image key. The runtime guarantees single-flight per
/// key; distinct Images reconcile concurrently and share no mutable state
/// beyond the tracker.
#[instrument(skip(ctx), fields(name = %obj.name_any(), namespace = obj.namespace()))]
pub(crate) async fn reconcile(obj: Arc<Image>, ctx: Arc<ControllerState>) -> Result<Action> {
    let client = ctx.client.clone();
    let namespace = obj.namespace().unwrap_or_else(|| "default".to_string());
    let name = obj.name_any();

    let images: Api<Image> = Api::namespaced(client.clone(), &namespace);
    let builds: Api<Build> = Api::namespaced(client.clone(), &namespace);
    let builders: Api<Builder> = Api::namespaced(client, &namespace);

    // Work on a fresh, exclusively owned read, never the watcher cache's
    // shared copy. Gone between enqueue and processing is not an error.
    let Some(mut image) = images.get_opt(&name).await.map_err(Error::KubeError)? else {
        debug!("Image {}/{} deleted before reconcile", namespace, name);
        return Ok(Action::await_change());
    };

    let current = fetch_current_build(&builds, &image).await?;

    // Backpressure: an in-flight build is never duplicated or superseded
    if let Some(build) = &current {
        if build.is_running() {
            debug!("Build {} still running, nothing to do", build.name_any());
            return Ok(Action::await_change());
        }
    }

    let builder_name = image.spec.builder_ref.clone();
    let builder = builders
        .get_opt(&builder_name)
        .await
        .map_err(Error::KubeError)?
        .ok_or_else(|| Error::BuilderNotFound {
            builder: builder_name.clone(),
            image: name.clone(),
        })?;

    ctx.tracker
        .track(&namespace, &builder_name, ObjectRef::from_obj(&image))?;

    let mut counter = image.build_counter();
    let (build, created) = match current {
        Some(existing) if !image.build_needed(Some(&existing), &builder) => (existing, false),
        _ => {
            let build = image.next_build(&builder);
            info!(
                "Creating build {} (ordinal {}) for image {}/{}",
                build.name_any(),
                counter,
                namespace,
                name
            );
            let created = builds
                .create(&PostParams::default(), &build)
                .await
                .map_err(Error::KubeError)?;
            counter += 1;
            (created, true)
        }
    };

    let desired = next_status(&image, &build, counter, created);
    if image.status.as_ref() != Some(&desired) {
        image.status = Some(desired);
        images
            .replace_status(
                &name,
                &PostParams::default(),
                serde_json::to_vec(&image).map_err(Error::SerializationError)?,
            )
            .await
            .map_err(Error::KubeError)?;
    }

    Ok(Action::await_change())
}

/// Status the Image should carry after this reconcile. Pure; when nothing
/// changed the result is identical to the stored status and the caller skips
/// the write.
pub(crate) fn next_status(
    image: &Image,
    build: &Build,
    counter: i64,
    created: bool,
) -> ImageStatus {
    let mut conditions = image
        .status
        .as_ref()
        .map(|s| s.conditions.clone())
        .unwrap_or_default();

    if created {
        set_condition(
            &mut conditions,
            CONDITION_TYPE_READY,
            CONDITION_STATUS_FALSE,
            "BuildRunning",
            &format!("build {} in progress", build.name_any()),
        );
    } else {
        set_condition(
            &mut conditions,
            CONDITION_TYPE_READY,
            CONDITION_STATUS_TRUE,
            "UpToDate",
            &format!("build {} is current", build.name_any()),
        );
    }

    ImageStatus {
        build_counter: counter,
        last_build_ref: Some(build.name_any()),
        observed_generation: image.metadata.generation,
        conditions,
    }
}

/// Error policy determines how to handle reconciliation errors
pub(crate) fn error_policy(image: Arc<Image>, error: &Error, _ctx: Arc<ControllerState>) -> Action {
    if error.is_conflict() {
        // Expected under races; the next attempt re-reads and settles
        debug!("Conflict reconciling {}: {:?}", image.name_any(), error);
        Action::requeue(Duration::from_secs(5))
    } else {
        error!("Reconciliation error for {}: {:?}", image.name_any(), error);
        Action::requeue(Duration::from_secs(30))
    }
}
