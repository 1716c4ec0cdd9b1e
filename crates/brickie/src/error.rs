use thiserror::Error;

/// Everything that can go wrong in brickie.
///
/// Only the setup-time variants (`InvalidRegistration`, `MissingMountTarget`,
/// `MissingLayout`, `UnknownTarget`) are ever returned to callers. The others
/// are built during a render pass purely so they can be logged; the offending
/// node or property is dropped and rendering continues.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BrickieError {
    #[error("invalid registration: {0}")]
    InvalidRegistration(String),

    #[error("a mount target is required to lay out a brick tree")]
    MissingMountTarget,

    #[error("a layout is required to mount")]
    MissingLayout,

    #[error("nothing is mounted on target '{0}'")]
    UnknownTarget(String),

    #[error("no brick registered for type '{0}'")]
    UnresolvedBrickType(String),

    #[error("failed to evaluate '{expression}': {message}")]
    ExpressionEvaluationFailure { expression: String, message: String },

    #[error("no handler prop '{prop}' on element '{key}'")]
    MissingHandler { key: String, prop: String },
}
