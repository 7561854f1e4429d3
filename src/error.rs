//! Error types for the kiln operator

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Kubernetes API error (transport failures, NotFound, Conflict, ...)
    #[error("Kubernetes API error: {0}")]
    KubeError(#[from] kube::Error),

    /// The Image status disagrees with the Builds actually stored, which
    /// indicates a prior partial write. Never auto-repaired by overwriting
    /// status; the reconcile fails and is redelivered.
    #[error("image {namespace}/{name} status out of sync with stored builds: {reason}")]
    StatusOutOfSync {
        namespace: String,
        name: String,
        reason: String,
    },

    /// The Builder an Image references does not exist (yet)
    #[error("builder {builder} referenced by image {image} not found")]
    BuilderNotFound { builder: String, image: String },

    /// Failed to register a Builder dependency. Treated as fatal to the
    /// reconcile: without the registration a later Builder change would be
    /// silently missed.
    #[error("failed to record builder dependency: {0}")]
    DependencyTracking(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    ConfigError(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    /// Expected-race failures: optimistic-concurrency conflicts on status
    /// updates and duplicate-create rejections on builds. Retried quickly and
    /// logged quietly.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::KubeError(kube::Error::Api(e)) if e.code == 409)
    }
}
