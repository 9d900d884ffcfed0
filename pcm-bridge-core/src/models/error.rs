use thiserror::Error;

/// Errors surfaced by the playback and capture engines.
///
/// Configuration and initialization failures never leave a partially
/// constructed session behind. Routing failures are produced by
/// [`RoutingBackend`](crate::traits::routing_backend::RoutingBackend)
/// implementations and are swallowed by the routing controller.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BridgeError {
    /// The requested rate/channel/encoding combination is not supported.
    #[error("unsupported configuration: {0}")]
    Configuration(String),

    /// A device handle was created but never reached a ready state.
    #[error("initialization failed: {0}")]
    Initialization(String),

    #[error("audio session not initialized")]
    NotInitialized,

    #[error("playback is paused")]
    Paused,

    /// Unexpected failure during a blocking read or write.
    #[error("i/o error: {0}")]
    Io(String),

    #[error("tone generation failed: {0}")]
    ToneGeneration(String),

    #[error("routing error: {0}")]
    Routing(String),

    #[error("storage error: {0}")]
    Storage(String),
}

pub type BridgeResult<T> = Result<T, BridgeError>;
