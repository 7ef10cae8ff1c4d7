//! Error and retry-policy types for the trigger domain.
//!
//! [`TriggerError`] covers invocation context that cannot produce a request;
//! it is always fatal and is raised before any network traffic.
//!
//! [`DispatchError`] covers a single failed attempt at the outbound call.
//! Each variant maps to a [`RetryPolicy`], which is the only input the retry
//! loop uses to decide whether to try again.

use thiserror::Error;

// ---------------------------------------------------------------------------
// Retry semantics
// ---------------------------------------------------------------------------

/// Whether a failed attempt is safe to retry. The delay before a retry is
/// the caller's fixed delay.
///
/// ## Rules
///
/// - `Retryable`: no response at all, HTTP 404, HTTP 5xx.
/// - `NonRetryable`: client-side timeout or abort, every other HTTP status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryPolicy {
    /// The attempt may be retried.
    Retryable,
    /// The attempt must not be retried; the run fails immediately.
    NonRetryable,
}

impl RetryPolicy {
    /// Returns `true` for [`RetryPolicy::Retryable`].
    pub fn is_retryable(&self) -> bool {
        matches!(self, RetryPolicy::Retryable)
    }
}

/// Applies the retry predicate to the observable facts of one failed attempt.
///
/// `status` is `None` when no response was received. `timed_out` is `true`
/// when the client itself gave up on the request; that case is never
/// retried, whatever else happened.
pub fn retry_policy_for(status: Option<u16>, timed_out: bool) -> RetryPolicy {
    if timed_out {
        return RetryPolicy::NonRetryable;
    }
    match status {
        None | Some(404) | Some(500..=599) => RetryPolicy::Retryable,
        Some(_) => RetryPolicy::NonRetryable,
    }
}

// ---------------------------------------------------------------------------
// Context errors
// ---------------------------------------------------------------------------

/// Errors raised while turning the invocation context into a request.
///
/// None of these are retried: the same environment would produce the same
/// error on every attempt.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TriggerError {
    /// The repository URL from the event payload does not contain a
    /// `github.com/ORG/REPO` path.
    #[error("Repository URL '{url}' does not identify a GitHub organization and repository")]
    MalformedRepositoryUrl {
        /// The URL as found in the event payload.
        url: String,
    },

    /// A required input was absent or empty.
    #[error("Required input '{name}' is missing or empty")]
    MissingInput {
        /// The environment variable or payload field that was expected.
        name: String,
    },
}

impl TriggerError {
    /// Builds a [`TriggerError::MissingInput`] for the named input.
    pub fn missing(name: impl Into<String>) -> Self {
        TriggerError::MissingInput { name: name.into() }
    }
}

// ---------------------------------------------------------------------------
// Dispatch errors
// ---------------------------------------------------------------------------

/// A single failed attempt at the pipeline-trigger call.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// The client gave up waiting, or the request was aborted locally.
    #[error("Request to {url} timed out: {message}")]
    Timeout {
        /// The endpoint that was being called.
        url: String,
        /// Transport-level description of the failure.
        message: String,
    },

    /// No response was received (connection refused, DNS failure, reset).
    #[error("No response from {url}: {message}")]
    Network {
        /// The endpoint that was being called.
        url: String,
        /// Transport-level description of the failure.
        message: String,
    },

    /// The request could not be built (e.g. a header value with control
    /// characters). Sending it again would fail the same way.
    #[error("Invalid pipeline trigger request: {message}")]
    InvalidRequest {
        /// Description of the problem.
        message: String,
    },

    /// The provider answered with a non-success status.
    #[error("Request failed with status code {status}: {body}")]
    Status {
        /// The HTTP status code.
        status: u16,
        /// The response body, verbatim.
        body: String,
    },
}

impl DispatchError {
    /// Classifies this failure for the retry loop.
    pub fn retry_policy(&self) -> RetryPolicy {
        match self {
            DispatchError::InvalidRequest { .. } => RetryPolicy::NonRetryable,
            _ => retry_policy_for(self.status(), matches!(self, DispatchError::Timeout { .. })),
        }
    }

    /// Returns the HTTP status code, if a response was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            DispatchError::Status { status, .. } => Some(*status),
            DispatchError::Timeout { .. }
            | DispatchError::Network { .. }
            | DispatchError::InvalidRequest { .. } => None,
        }
    }
}
