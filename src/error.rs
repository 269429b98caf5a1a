//! Build-fatal error taxonomy.
//!
//! None of these are recovered locally: the engine has no retry policy,
//! so every failure aborts the in-progress build and propagates to the
//! top-level caller with the offending path and phase attached.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Errors that abort a site generation run.
#[derive(Debug, Error)]
pub enum GenerateError {
    /// An entry path resolved to a different origin. Discovered links
    /// to external origins are silently dropped; entries must always
    /// be internal.
    #[error("entry path `{path}` resolves to an external origin; entries must be internal")]
    ExternalEntry {
        /// The offending entry path, as supplied
        path: String,
    },

    /// The render function or its markup production failed.
    #[error("render failed for `{path}`: {cause}")]
    Render {
        /// The page being rendered
        path: String,
        /// The collaborator's error
        cause: anyhow::Error,
    },

    /// Markup production missed its wall-clock deadline.
    #[error("render timed out for `{path}` after {deadline:?}")]
    RenderTimeout {
        /// The page being rendered
        path: String,
        /// The deadline that fired
        deadline: Duration,
    },

    /// Filesystem failure during temp-write or rename.
    #[error("commit failed for `{path}`: {source}")]
    Commit {
        /// The page being committed
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A plugin's build phase failed.
    #[error("plugin `{plugin}` failed during {phase}: {cause}")]
    Plugin {
        /// The plugin's declared name
        plugin: String,
        /// Which build phase was running
        phase: PluginPhase,
        /// The plugin's error
        cause: anyhow::Error,
    },
}

/// The plugin build phase an error occurred in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginPhase {
    PreBuild,
    PostBuild,
}

impl fmt::Display for PluginPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PreBuild => write!(f, "pre-build"),
            Self::PostBuild => write!(f, "post-build"),
        }
    }
}

/// Terminal failure of a render stream.
///
/// A timeout is tagged distinctly from a plain failure so callers can
/// log or alert on the two differently, but both abort the build.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Markup production did not finish before the deadline.
    #[error("render timed out after {0:?}")]
    Timeout(Duration),

    /// Markup production raised an error, including from suspended
    /// sub-computations.
    #[error("markup production failed: {0}")]
    Failed(anyhow::Error),
}

/// Why a page commit failed: the producing stream or the filesystem.
#[derive(Debug, Error)]
pub enum CommitFailure {
    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
