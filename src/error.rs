//! Error taxonomy of the engine.
//!
//! # Propagation
//! - [`ResolutionError`] is fatal to the current request only; callers map it
//!   to a not-found outcome.
//! - [`ConfigurationError`] is fatal only to the configuration root being
//!   built; that root keeps its last good instance.
//! - [`SourceError`] aborts the current rebuild attempt; the published model
//!   stays in place until the next change notification or forced refresh.
//!
//! All errors are `Clone` so a single-flight build can hand the same outcome
//! to every waiter.

use thiserror::Error;

/// Errors raised by a [`ConfigurationSource`](crate::source::ConfigurationSource).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    /// Transient read failure.
    #[error("configuration source unavailable: {0}")]
    Unavailable(String),

    #[error("node not found: {0}")]
    NotFound(String),

    #[error("node already exists: {0}")]
    AlreadyExists(String),

    /// The serialized tree document could not be parsed.
    #[error("invalid tree document: {0}")]
    InvalidDocument(String),
}

/// No host, mount or sitemap item matches where one is required.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionError {
    #[error("no virtual host matches '{0}'")]
    HostNotFound(String),

    #[error("host '{host}' has no mount for port {port}")]
    MountNotFound { host: String, port: u16 },

    #[error("mount '{0}' is not mapped to a site")]
    UnmappedMount(String),

    #[error("site of mount '{0}' is unavailable")]
    SiteUnavailable(String),

    #[error("no sitemap item matches '{0}' and no page-not-found item is configured")]
    SiteMapItemNotFound(String),
}

/// Invalid configuration detected while composing a configuration root.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("inheritance cycle in '{root}' at '{path}'")]
    InheritanceCycle { root: String, path: String },

    #[error("component reference cycle at '{0}'")]
    ReferenceCycle(String),

    #[error("container '{0}' must not carry a reference component")]
    ContainerWithReference(String),

    #[error("container reference '{0}' has no reference component")]
    MissingReference(String),

    #[error("configuration root '{0}' does not exist")]
    MissingRoot(String),

    #[error("invalid inherits-from entry '{entry}' on '{root}'")]
    InvalidInheritsFrom { root: String, entry: String },
}

/// Failure to build a single configuration root.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Source(#[from] SourceError),
}

/// Failure to produce a whole `VirtualHosts` model.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error("hosts tree '{0}' is missing")]
    MissingHosts(String),
}

/// Failure to instantiate or run a sitemap item handler.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandlerError {
    #[error("no handler registered for type '{0}'")]
    UnknownType(String),

    #[error("handler '{handler}' requires property '{property}'")]
    MissingProperty { handler: String, property: String },

    #[error("handler '{handler}' failed: {reason}")]
    Failed { handler: String, reason: String },
}

pub type SourceResult<T> = Result<T, SourceError>;
pub type BuildResult<T> = Result<T, BuildError>;
pub type ModelResult<T> = Result<T, ModelError>;
pub type HandlerResult<T> = Result<T, HandlerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ResolutionError::MountNotFound {
            host: "localhost".into(),
            port: 8081,
        };
        assert_eq!(err.to_string(), "host 'localhost' has no mount for port 8081");

        let err = BuildError::from(ConfigurationError::MissingReference("/a/b".into()));
        assert_eq!(err.to_string(), "container reference '/a/b' has no reference component");
    }
}
