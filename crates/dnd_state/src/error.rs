//! Reactive-layer error types.

/// Errors raised while running effects or draining the task queue.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    /// An effect body returned an error.
    #[error("effect {effect} failed: {source}")]
    Effect {
        /// The effect that failed.
        effect: u64,
        #[source]
        source: anyhow::Error,
    },

    /// A write re-triggered an effect that was still executing.
    #[error("cycle detected: effect {0} re-triggered itself while running")]
    Cycle(u64),

    /// A deferred task returned an error.
    #[error("deferred task failed: {0}")]
    Task(#[source] anyhow::Error),
}
