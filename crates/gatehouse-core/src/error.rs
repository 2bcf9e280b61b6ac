//! Error types for Gatehouse

/// Result type alias using Gatehouse's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for Gatehouse operations
///
/// Two classes never overlap: a rule that simply does not apply to a request is
/// not an error at all (it evaluates false), while everything in [`Error::Setup`]
/// and [`Error::Unbound`] points at a misconfigured policy and must surface.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Policy authoring errors
    #[error("setup error: {0}")]
    Setup(String),

    /// A free-form expression referenced a binding that is not on the stack
    #[error("no binding named '{0}' in the current context")]
    Unbound(String),

    /// The provider (actor loader, resource source) failed
    #[error("provider error: {0}")]
    Provider(String),

    /// Access vetoed by a forbid rule
    #[error("access forbidden")]
    Forbidden,

    /// No profile allowed the action
    #[error("access denied: {0}")]
    Denied(String),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// Network/IO errors
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML document errors
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    /// Create a new setup error
    pub fn setup(msg: impl Into<String>) -> Self {
        Self::Setup(msg.into())
    }

    /// Create a new provider error
    pub fn provider(msg: impl Into<String>) -> Self {
        Self::Provider(msg.into())
    }

    /// Create a new denial
    pub fn denied(msg: impl Into<String>) -> Self {
        Self::Denied(msg.into())
    }

    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// True for errors caused by a misconfigured policy
    pub fn is_setup(&self) -> bool {
        matches!(self, Self::Setup(_) | Self::Unbound(_))
    }
}
