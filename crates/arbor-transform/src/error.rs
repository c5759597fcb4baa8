use arbor_core::ModelError;
use thiserror::Error;

/// Result type produced by transformation operations.
pub type Result<T> = std::result::Result<T, TransformError>;

/// Error raised by the transformation engine.
///
/// Every variant except [`RuleFailed`](TransformError::RuleFailed) indicates a
/// defect in the rule configuration or in how the engine was called, not
/// malformed input; those are fatal regardless of the generic-node fallback.
#[derive(Debug, Error)]
pub enum TransformError {
    #[error("cannot produce a single node for `{type_name}`: {count} nodes were produced")]
    AmbiguousResult { type_name: String, count: usize },
    #[error("received a collection where a single value was expected for `{feature}`")]
    CollectionWhereValueExpected { feature: String },
    #[error("received a single value where a collection was expected for `{feature}`")]
    ValueWhereCollectionExpected { feature: String },
    #[error("no transformation rule for source type `{type_name}`")]
    UntranslatedNode { type_name: String },
    #[error("transformation rule for `{type_name}` failed: {report:#}")]
    RuleFailed {
        type_name: String,
        report: eyre::Report,
    },
    #[error("could not assign child `{feature}`: {report:#}")]
    ChildAssignmentFailed {
        feature: String,
        report: eyre::Report,
    },
    #[error("abstract type `{0}` has no instantiable variant")]
    NoInstantiableVariant(String),
    #[error("placeholder construction for `{0}` exceeded the recursion bound")]
    PlaceholderDepthExceeded(String),
    #[error("enum `{0}` has no constants to pick a canonical value from")]
    EmptyEnum(String),
    #[error(transparent)]
    Model(#[from] ModelError),
}

/// Whether a model error signals a rule-configuration defect rather than a
/// failed construction. Configuration defects stay fatal even when the
/// generic-node fallback is enabled.
pub(crate) fn is_configuration_defect(error: &ModelError) -> bool {
    matches!(
        error,
        ModelError::UnknownFeature { .. }
            | ModelError::ReservedFeatureName(_)
            | ModelError::DuplicateFeature { .. }
            | ModelError::NotAbstract(_)
            | ModelError::VariantsAlreadySealed(_)
    )
}
