use thiserror::Error;

/// Result type produced by node-model operations.
pub type Result<T> = std::result::Result<T, ModelError>;

/// Error raised while declaring node types or mutating node state.
///
/// These are configuration defects in a metamodel or a transformation rule,
/// not malformed input: callers are expected to fail fast on them.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("feature name `{0}` is reserved")]
    ReservedFeatureName(String),
    #[error("duplicate feature `{feature}` on type `{type_name}`")]
    DuplicateFeature { type_name: String, feature: String },
    #[error("unknown feature `{feature}` on type `{type_name}`")]
    UnknownFeature { type_name: String, feature: String },
    #[error(
        "value for `{feature}` on `{type_name}` does not conform: expected {expected}, got {actual}"
    )]
    TypeMismatch {
        type_name: String,
        feature: String,
        expected: String,
        actual: String,
    },
    #[error("type `{0}` is abstract and cannot be instantiated")]
    AbstractType(String),
    #[error("type `{type_name}` is not constructible without values: feature `{feature}` is required")]
    NotDefaultConstructible { type_name: String, feature: String },
    #[error("missing value for required feature `{feature}` of `{type_name}`")]
    MissingFeatureValue { type_name: String, feature: String },
    #[error("variants of `{0}` have already been sealed")]
    VariantsAlreadySealed(String),
    #[error("type `{0}` is not abstract and cannot declare variants")]
    NotAbstract(String),
}
