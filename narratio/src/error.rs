//! Error types returned by sagas and the scheduler.

use crate::saga::TaskId;

use std::borrow::Cow;
use std::error::Error as StdError;
use std::sync::Arc;
use thiserror::Error;

/// Result type returned by saga bodies and effect helpers.
pub type SagaResult<T = ()> = Result<T, SagaError>;

/// Errors produced while running sagas.
///
/// Cancellation is never reported through this type: a cancelled task
/// settles with [`TaskOutcome::Cancelled`](crate::saga::TaskOutcome).
#[derive(Debug, Clone, Error)]
pub enum SagaError {
    /// A `Call` effect's target returned an error.
    ///
    /// The error is handed back to the task at the point where it awaited
    /// the call, where it can be caught and turned into an action.
    #[error("call `{name}` failed: {source}")]
    Call {
        name: Cow<'static, str>,
        #[source]
        source: Arc<dyn StdError + Send + Sync>,
    },

    /// A joined task failed.
    #[error("task {id} ({name}) failed")]
    Task {
        id: TaskId,
        name: Cow<'static, str>,
        #[source]
        source: Box<SagaError>,
    },

    /// A saga was started while no runtime was driving the current thread.
    #[error("no runtime is running on this thread")]
    NoRuntime,

    /// Application-defined failure.
    #[error("{0}")]
    Custom(Cow<'static, str>),
}

impl SagaError {
    /// Creates an application-defined error from a message.
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// return Err(SagaError::msg("empty search query"));
    /// ```
    pub fn msg(message: impl Into<Cow<'static, str>>) -> Self {
        SagaError::Custom(message.into())
    }

    pub(crate) fn call(
        name: Cow<'static, str>,
        source: impl Into<Box<dyn StdError + Send + Sync>>,
    ) -> Self {
        SagaError::Call {
            name,
            source: Arc::from(source.into()),
        }
    }

    /// Returns `true` for a failed `Call` effect.
    pub fn is_call(&self) -> bool {
        matches!(self, SagaError::Call { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn call_error_keeps_its_source() {
        let err = SagaError::call("fetchTodos".into(), "connection refused");

        assert!(err.is_call());
        assert_eq!(err.to_string(), "call `fetchTodos` failed: connection refused");
        assert_eq!(
            err.source().map(ToString::to_string).as_deref(),
            Some("connection refused")
        );
    }

    #[test]
    fn custom_message() {
        let err = SagaError::msg("boom");

        assert!(!err.is_call());
        assert_eq!(err.to_string(), "boom");
    }
}
