//! Error types shared across the network plugins
//!
//! Every failure a lifecycle hook can produce collapses into two kinds: the
//! orchestration API misbehaved (`ApiCall`), or a local invariant was violated
//! (`Internal`). The host reconciler retries by re-invoking the same hook, so
//! neither kind carries retry state.

use thiserror::Error;

use crate::allocator::AllocationError;
use crate::api::ApiError;

/// Classification of a plugin failure, exposed to the host reconciler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// An orchestration-platform call failed or returned unexpected state
    ApiCallError,
    /// A local invariant was violated (missing or malformed annotation, etc.)
    InternalError,
}

/// Error returned by every plugin lifecycle hook
#[derive(Error, Debug)]
pub enum PluginError {
    #[error("API call error: {0}")]
    ApiCall(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl PluginError {
    /// Build an internal (invariant-violation) error
    pub fn internal(message: impl Into<String>) -> Self {
        PluginError::Internal(message.into())
    }

    /// Build an API-call error
    pub fn api_call(message: impl Into<String>) -> Self {
        PluginError::ApiCall(message.into())
    }

    /// The kind of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            PluginError::ApiCall(_) => ErrorKind::ApiCallError,
            PluginError::Internal(_) => ErrorKind::InternalError,
        }
    }
}

impl From<ApiError> for PluginError {
    fn from(err: ApiError) -> Self {
        PluginError::ApiCall(err.to_string())
    }
}

impl From<AllocationError> for PluginError {
    fn from(err: AllocationError) -> Self {
        PluginError::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind() {
        assert_eq!(
            PluginError::api_call("boom").kind(),
            ErrorKind::ApiCallError
        );
        assert_eq!(
            PluginError::internal("bad annotation").kind(),
            ErrorKind::InternalError
        );
    }

    #[test]
    fn test_api_error_wraps_as_api_call() {
        let err = ApiError::Http("connection refused".to_string());
        let plugin_err: PluginError = err.into();
        assert_eq!(plugin_err.kind(), ErrorKind::ApiCallError);
    }

    #[test]
    fn test_allocation_error_wraps_as_internal() {
        let err = AllocationError::NotBootstrapped;
        let plugin_err: PluginError = err.into();
        assert_eq!(plugin_err.kind(), ErrorKind::InternalError);
    }
}
