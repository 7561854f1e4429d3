//! Dependency tracking from Builders back to the Images that use them
//!
//! Images reference Builders by name without owning them, so the controller
//! runtime cannot map Builder events to Images on its own. The tracker keeps
//! an expiring registry of that relation: each successful reconcile re-arms
//! the registration, and an entry that stops being refreshed ages out instead
//! of living forever.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use kube::runtime::reflector::ObjectRef;
use kube::ResourceExt;

use crate::crd::{Builder, Image};
use crate::error::{Error, Result};

/// Default time a registration stays live without being refreshed
pub const DEFAULT_TRACK_TTL: Duration = Duration::from_secs(10 * 60);

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct BuilderKey {
    namespace: String,
    name: String,
}

pub struct Tracker {
    ttl: Duration,
    tracked: Mutex<HashMap<BuilderKey, HashMap<ObjectRef<Image>, Instant>>>,
}

impl Tracker {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            tracked: Mutex::new(HashMap::new()),
        }
    }

    /// Record that `image` must be re-reconciled whenever the named Builder
    /// changes. The registration expires after the tracker TTL and is
    /// refreshed by the next successful reconcile of the Image.
    pub fn track(
        &self,
        builder_namespace: &str,
        builder_name: &str,
        image: ObjectRef<Image>,
    ) -> Result<()> {
        let mut tracked = self
            .tracked
            .lock()
            .map_err(|e| Error::DependencyTracking(e.to_string()))?;

        let key = BuilderKey {
            namespace: builder_namespace.to_string(),
            name: builder_name.to_string(),
        };
        let now = Instant::now();
        // A TTL too large for the clock to represent is clamped to a year;
        // plain Instant addition would panic on overflow
        let deadline = now
            .checked_add(self.ttl)
            .unwrap_or_else(|| now + Duration::from_secs(365 * 24 * 60 * 60));
        tracked.entry(key).or_default().insert(image, deadline);
        Ok(())
    }

    /// Images currently registered against `builder`, pruning expired
    /// registrations on the way out. Used as the controller's watch mapper:
    /// every returned ref is re-enqueued for reconciliation.
    pub fn tracking(&self, builder: &Builder) -> Vec<ObjectRef<Image>> {
        let key = BuilderKey {
            namespace: builder.namespace().unwrap_or_default(),
            name: builder.name_any(),
        };

        let now = Instant::now();
        let mut tracked = match self.tracked.lock() {
            Ok(guard) => guard,
            Err(_) => return Vec::new(),
        };

        let Some(images) = tracked.get_mut(&key) else {
            return Vec::new();
        };
        images.retain(|_, deadline| *deadline > now);

        let refs: Vec<ObjectRef<Image>> = images.keys().cloned().collect();
        if refs.is_empty() {
            tracked.remove(&key);
        }
        refs
    }
}
