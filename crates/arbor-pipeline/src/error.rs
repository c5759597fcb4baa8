use arbor_transform::TransformError;
use thiserror::Error;

/// Result type produced by parsing pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Error aborting a parsing run.
///
/// First-stage collaborator failures propagate as-is; second-stage failures
/// follow the engine's fallback policy, so only fatal transformation errors
/// surface here.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("first-stage parser failed: {0:#}")]
    FirstStage(eyre::Report),
    #[error(transparent)]
    Transform(#[from] TransformError),
}
