use crate::foundation::core::ObjectId;

/// Convenience result type used across framesync.
pub type SyncResult<T> = Result<T, SyncError>;

/// Top-level error taxonomy used by the synchronization engine.
#[derive(thiserror::Error, Debug)]
pub enum SyncError {
    /// Invalid user-provided scene or request data.
    #[error("validation error: {0}")]
    Validation(String),

    /// The scene program failed while being (re-)executed.
    #[error("scene load error: {scene}")]
    Load {
        /// Scene or script that failed.
        scene: String,
        /// What went wrong, with its own cause chain.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },

    /// A seek could not be resolved against the recorded timeline.
    #[error("seek error: {0}")]
    Seek(String),

    /// An object id is not known to the identity registry.
    #[error("object {0} is not registered")]
    NotFound(ObjectId),

    /// No scene is currently being served (never loaded, or the last reload failed).
    #[error("scene unavailable: {0}")]
    Unavailable(String),

    /// The renderer could not be notified or launched.
    #[error("renderer error: {0}")]
    Renderer(String),

    /// Malformed RPC traffic.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Errors when serializing or deserializing data structures.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SyncError {
    /// Build a [`SyncError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`SyncError::Load`] value for `scene` failing with `source`.
    pub fn load(
        scene: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
    ) -> Self {
        Self::Load {
            scene: scene.into(),
            source: source.into(),
        }
    }

    /// Build a [`SyncError::Seek`] value.
    pub fn seek(msg: impl Into<String>) -> Self {
        Self::Seek(msg.into())
    }

    /// Build a [`SyncError::Unavailable`] value.
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    /// Build a [`SyncError::Renderer`] value.
    pub fn renderer(msg: impl Into<String>) -> Self {
        Self::Renderer(msg.into())
    }

    /// Build a [`SyncError::Protocol`] value.
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    /// Build a [`SyncError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    /// Render this error and its whole source chain as multi-line trace text.
    pub fn trace_text(&self) -> String {
        let mut out = format!("Error: {self}");
        let mut source = std::error::Error::source(self);
        let mut depth = 0usize;
        while let Some(cause) = source {
            if depth == 0 {
                out.push_str("\n\nCaused by:");
            }
            out.push_str(&format!("\n    {depth}: {cause}"));
            depth += 1;
            source = cause.source();
        }
        out
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serde(err.to_string())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
