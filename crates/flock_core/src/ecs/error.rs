use thiserror::Error;

/// Errors surfaced by the registry. Lookup misses are not errors; they come
/// back as `None` / `false`.
#[derive(Debug, Error)]
pub enum EcsError {
    #[error("all {limit} component mask bits are already registered")]
    ComponentTypesExhausted { limit: usize },

    #[error("component stride {stride} exceeds the {max} byte limit")]
    StrideTooLarge { stride: usize, max: usize },

    #[error("systems must have a non-empty name")]
    EmptySystemName,

    #[error("failed to build worker pool")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}
