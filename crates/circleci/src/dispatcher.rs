//! The trigger dispatcher: one request, bounded fixed-delay retry.
//!
//! ```text
//! Idle → Sending → Success
//!           │
//!           ├─ retryable, budget left → Retrying → (delay) → Sending
//!           ├─ retryable, budget spent → FailedFinal
//!           └─ not retryable           → FailedFinal
//! ```

use serde_json::Value;
use thiserror::Error;
use trigger::{DispatchError, PipelineTrigger, TriggerRequest};

use crate::retry::{retry_with_fixed_delay, RetryConfig, RetryOutcome};

/// A successful dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchReport {
    /// The provider's response body.
    pub response: Value,
    /// Attempts made, including the successful one.
    pub attempts: u32,
}

/// A dispatch that ended in `FailedFinal`.
///
/// The message already includes the last attempt's error, so it is not
/// exposed again as a source.
#[derive(Debug, Error)]
pub enum DispatchFailure {
    /// Every attempt failed with a retryable error.
    #[error("{last_error} (gave up after {attempts} attempts)")]
    RetriesExhausted {
        /// Attempts made.
        attempts: u32,
        /// The error from the final attempt.
        last_error: DispatchError,
    },

    /// An attempt failed with an error that is never retried.
    #[error("{error}")]
    Rejected {
        /// Attempts made, including the rejected one.
        attempts: u32,
        /// The error that stopped the dispatch.
        error: DispatchError,
    },
}

impl DispatchFailure {
    /// The error from the last attempt.
    pub fn last_error(&self) -> &DispatchError {
        match self {
            DispatchFailure::RetriesExhausted { last_error, .. } => last_error,
            DispatchFailure::Rejected { error, .. } => error,
        }
    }

    /// Attempts made before giving up.
    pub fn attempts(&self) -> u32 {
        match self {
            DispatchFailure::RetriesExhausted { attempts, .. }
            | DispatchFailure::Rejected { attempts, .. } => *attempts,
        }
    }
}

/// Sends a [`TriggerRequest`] through a [`PipelineTrigger`], retrying
/// transient failures.
#[derive(Debug, Clone)]
pub struct TriggerDispatcher<T> {
    transport: T,
    retry: RetryConfig,
}

impl<T: PipelineTrigger> TriggerDispatcher<T> {
    /// Creates a dispatcher.
    pub fn new(transport: T, retry: RetryConfig) -> Self {
        Self { transport, retry }
    }

    /// The retry bounds in effect.
    pub fn retry_config(&self) -> RetryConfig {
        self.retry
    }

    /// Sends `request` until it succeeds, is rejected, or the retry budget
    /// runs out.
    ///
    /// # Errors
    ///
    /// [`DispatchFailure`] carrying the last attempt's error.
    #[tracing::instrument(skip_all, fields(project = %request.project, target = %request.payload.target()))]
    pub async fn dispatch(
        &self,
        request: &TriggerRequest,
    ) -> Result<DispatchReport, DispatchFailure> {
        let transport = &self.transport;
        let outcome = retry_with_fixed_delay(
            self.retry,
            |err: &DispatchError| err.retry_policy().is_retryable(),
            move |attempt| {
                tracing::info!(attempt, "Sending pipeline trigger request");
                transport.trigger(request)
            },
        )
        .await;

        match outcome {
            RetryOutcome::Success { value, attempts } => {
                tracing::info!(attempts, "Pipeline trigger accepted");
                Ok(DispatchReport {
                    response: value,
                    attempts,
                })
            }
            RetryOutcome::Exhausted {
                last_error,
                attempts,
            } => {
                tracing::error!(attempts, error = %last_error, "Pipeline trigger retries exhausted");
                Err(DispatchFailure::RetriesExhausted {
                    attempts,
                    last_error,
                })
            }
            RetryOutcome::Rejected { error, attempts } => {
                tracing::error!(attempts, error = %error, "Pipeline trigger rejected");
                Err(DispatchFailure::Rejected { attempts, error })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use serde_json::json;
    use trigger::{ActionName, ActorLogin, EventName, GitRef, RequestContext};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::{ApiToken, CircleCiClient, ClientOptions};

    /// Replays a fixed script of results, one per call.
    struct ScriptedTrigger {
        script: Mutex<VecDeque<Result<Value, DispatchError>>>,
        calls: Mutex<u32>,
    }

    impl ScriptedTrigger {
        fn new(script: Vec<Result<Value, DispatchError>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                calls: Mutex::new(0),
            }
        }

        fn calls(&self) -> u32 {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl<'a> PipelineTrigger for &'a ScriptedTrigger {
        async fn trigger(&self, _request: &TriggerRequest) -> Result<Value, DispatchError> {
            *self.calls.lock().unwrap() += 1;
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .expect("script exhausted")
        }
    }

    fn status(code: u16) -> Result<Value, DispatchError> {
        Err(DispatchError::Status {
            status: code,
            body: String::new(),
        })
    }

    fn request() -> TriggerRequest {
        let ctx = RequestContext::new(
            "https://github.com/acme/widgets",
            GitRef::new("refs/heads/main").unwrap(),
            ActorLogin::new("octocat").unwrap(),
            EventName::new("push").unwrap(),
            ActionName::new("trigger").unwrap(),
            None,
        );
        TriggerRequest::from_context(&ctx).unwrap()
    }

    fn fast() -> RetryConfig {
        RetryConfig::new(10, Duration::from_millis(1))
    }

    #[tokio::test]
    async fn server_error_then_success_retries_once() {
        let transport = ScriptedTrigger::new(vec![status(503), Ok(json!({"number": 1}))]);
        let dispatcher = TriggerDispatcher::new(&transport, fast());
        assert_eq!(dispatcher.retry_config(), fast());

        let report = dispatcher.dispatch(&request()).await.unwrap();

        assert_eq!(report.attempts, 2);
        assert_eq!(report.response, json!({"number": 1}));
        assert_eq!(transport.calls(), 2);
    }

    #[tokio::test]
    async fn forbidden_fails_without_retry() {
        let transport = ScriptedTrigger::new(vec![status(403)]);
        let dispatcher = TriggerDispatcher::new(&transport, fast());

        let failure = dispatcher.dispatch(&request()).await.unwrap_err();

        assert!(matches!(failure, DispatchFailure::Rejected { attempts: 1, .. }));
        assert_eq!(failure.last_error().status(), Some(403));
        assert_eq!(failure.to_string(), "Request failed with status code 403: ");
        assert!(std::error::Error::source(&failure).is_none());
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn not_found_and_network_failures_are_retried() {
        let transport = ScriptedTrigger::new(vec![
            status(404),
            Err(DispatchError::Network {
                url: "https://circleci.com".into(),
                message: "connection reset".into(),
            }),
            status(500),
            Ok(json!({})),
        ]);
        let dispatcher = TriggerDispatcher::new(&transport, fast());

        let report = dispatcher.dispatch(&request()).await.unwrap();
        assert_eq!(report.attempts, 4);
    }

    #[tokio::test]
    async fn timeout_is_not_retried() {
        let transport = ScriptedTrigger::new(vec![Err(DispatchError::Timeout {
            url: "https://circleci.com".into(),
            message: "operation timed out".into(),
        })]);
        let dispatcher = TriggerDispatcher::new(&transport, fast());

        let failure = dispatcher.dispatch(&request()).await.unwrap_err();
        assert_eq!(failure.attempts(), 1);
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn persistent_server_error_exhausts_ten_retries() {
        let transport = ScriptedTrigger::new((0..11).map(|_| status(502)).collect());
        let dispatcher = TriggerDispatcher::new(&transport, RetryConfig::default());

        let failure = dispatcher.dispatch(&request()).await.unwrap_err();

        assert!(matches!(
            failure,
            DispatchFailure::RetriesExhausted { attempts: 11, .. }
        ));
        assert_eq!(transport.calls(), 11);
        assert!(failure.to_string().contains("status code 502"));
    }

    #[tokio::test]
    async fn end_to_end_service_unavailable_then_created() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/v2/project/gh/acme/widgets/pipeline"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/v2/project/gh/acme/widgets/pipeline"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"state": "created"})))
            .expect(1)
            .mount(&server)
            .await;

        let client = CircleCiClient::new(
            ApiToken::new("cci-secret").unwrap(),
            ClientOptions {
                base_url: server.uri(),
                timeout: None,
            },
        )
        .unwrap();
        let dispatcher = TriggerDispatcher::new(client, fast());

        let report = dispatcher.dispatch(&request()).await.unwrap();
        assert_eq!(report.attempts, 2);
        assert_eq!(report.response["state"], "created");
    }

    #[tokio::test]
    async fn end_to_end_forbidden_is_not_retried() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({"message": "Permission denied"})))
            .expect(1)
            .mount(&server)
            .await;

        let client = CircleCiClient::new(
            ApiToken::new("cci-secret").unwrap(),
            ClientOptions {
                base_url: server.uri(),
                timeout: None,
            },
        )
        .unwrap();
        let dispatcher = TriggerDispatcher::new(client, fast());

        let failure = dispatcher.dispatch(&request()).await.unwrap_err();
        assert!(matches!(failure, DispatchFailure::Rejected { attempts: 1, .. }));
    }
}
