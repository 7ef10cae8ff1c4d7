//! HTTP client for the CircleCI v2 pipeline-trigger endpoint.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde_json::Value;
use trigger::{DispatchError, PipelineTrigger, ProjectSlug, TriggerRequest};

/// Public CircleCI API host.
pub const DEFAULT_BASE_URL: &str = "https://circleci.com";

/// Header carrying the personal API token.
pub const CIRCLE_TOKEN_HEADER: &str = "Circle-Token";

/// Attribution header naming the login that caused the trigger.
pub const ATTRIBUTION_LOGIN_HEADER: &str = "x-attribution-login";

/// Attribution header naming the actor that caused the trigger.
pub const ATTRIBUTION_ACTOR_ID_HEADER: &str = "x-attribution-actor-id";

// ---------------------------------------------------------------------------
// Token
// ---------------------------------------------------------------------------

/// A CircleCI API token. `Debug` output is redacted.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiToken(String);

impl ApiToken {
    /// Wraps a token, returning `None` if it is empty.
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let v = value.into();
        if v.is_empty() {
            None
        } else {
            Some(Self(v))
        }
    }

    fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for ApiToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ApiToken(<redacted>)")
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Connection settings for [`CircleCiClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientOptions {
    /// Scheme and host of the API, without a trailing path.
    pub base_url: String,
    /// Whole-request timeout. `None` leaves requests unbounded.
    pub timeout: Option<Duration>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            timeout: None,
        }
    }
}

/// Sends pipeline-trigger calls to CircleCI. One attempt per call.
#[derive(Debug, Clone)]
pub struct CircleCiClient {
    http: reqwest::Client,
    base_url: String,
    token: ApiToken,
}

impl CircleCiClient {
    /// Creates a client.
    ///
    /// # Errors
    ///
    /// Returns the underlying error if the TLS backend cannot be initialised.
    pub fn new(token: ApiToken, options: ClientOptions) -> Result<Self, reqwest::Error> {
        let mut builder = reqwest::Client::builder()
            .user_agent(concat!("circleci-trigger/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = options.timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            http: builder.build()?,
            base_url: options.base_url.trim_end_matches('/').to_owned(),
            token,
        })
    }

    /// Full URL of the pipeline-trigger endpoint for `project`.
    pub fn pipeline_url(&self, project: &ProjectSlug) -> String {
        format!("{}/{}", self.base_url, project.pipeline_path())
    }
}

fn transport_error(url: &str, err: reqwest::Error) -> DispatchError {
    if err.is_builder() {
        DispatchError::InvalidRequest {
            message: err.to_string(),
        }
    } else if err.is_timeout() {
        DispatchError::Timeout {
            url: url.to_owned(),
            message: err.to_string(),
        }
    } else {
        DispatchError::Network {
            url: url.to_owned(),
            message: err.to_string(),
        }
    }
}

#[async_trait]
impl PipelineTrigger for CircleCiClient {
    #[tracing::instrument(skip_all, fields(project = %request.project))]
    async fn trigger(&self, request: &TriggerRequest) -> Result<Value, DispatchError> {
        let url = self.pipeline_url(&request.project);
        let response = self
            .http
            .post(&url)
            .header(CONTENT_TYPE, "application/json")
            .header(ATTRIBUTION_LOGIN_HEADER, request.actor.as_str())
            .header(ATTRIBUTION_ACTOR_ID_HEADER, request.actor.as_str())
            .header(CIRCLE_TOKEN_HEADER, self.token.expose())
            .json(&request.payload)
            .send()
            .await
            .map_err(|e| transport_error(&url, e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| transport_error(&url, e))?;
        tracing::debug!(status = status.as_u16(), "Received pipeline trigger response");

        if !status.is_success() {
            return Err(DispatchError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(serde_json::from_str(&body).unwrap_or(Value::String(body)))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use trigger::{ActionName, ActorLogin, EventName, GitRef, RequestContext};
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn request(git_ref: &str) -> TriggerRequest {
        let ctx = RequestContext::new(
            "https://github.com/acme/widgets",
            GitRef::new(git_ref).unwrap(),
            ActorLogin::new("octocat").unwrap(),
            EventName::new("push").unwrap(),
            ActionName::new("trigger").unwrap(),
            None,
        );
        TriggerRequest::from_context(&ctx).unwrap()
    }

    fn client(server: &MockServer, timeout: Option<Duration>) -> CircleCiClient {
        CircleCiClient::new(
            ApiToken::new("cci-secret").unwrap(),
            ClientOptions {
                base_url: server.uri(),
                timeout,
            },
        )
        .unwrap()
    }

    #[test]
    fn token_debug_is_redacted() {
        let token = ApiToken::new("cci-secret").unwrap();
        assert!(!format!("{token:?}").contains("cci-secret"));
        assert!(ApiToken::new("").is_none());
    }

    #[test]
    fn pipeline_url_uses_default_host() {
        let client = CircleCiClient::new(
            ApiToken::new("t").unwrap(),
            ClientOptions::default(),
        )
        .unwrap();
        assert_eq!(
            client.pipeline_url(&request("refs/heads/main").project),
            "https://circleci.com/api/v2/project/gh/acme/widgets/pipeline"
        );
    }

    #[test]
    fn trailing_slash_on_base_url_is_ignored() {
        let client = CircleCiClient::new(
            ApiToken::new("t").unwrap(),
            ClientOptions {
                base_url: "http://localhost:8080/".into(),
                timeout: None,
            },
        )
        .unwrap();
        assert_eq!(
            client.pipeline_url(&request("refs/heads/main").project),
            "http://localhost:8080/api/v2/project/gh/acme/widgets/pipeline"
        );
    }

    #[tokio::test]
    async fn sends_headers_and_body() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/v2/project/gh/acme/widgets/pipeline"))
            .and(header("Circle-Token", "cci-secret"))
            .and(header("x-attribution-login", "octocat"))
            .and(header("x-attribution-actor-id", "octocat"))
            .and(header("content-type", "application/json"))
            .and(body_json(json!({
                "parameters": {
                    "GHA_Actor": "octocat",
                    "GHA_Action": "trigger",
                    "GHA_Event": "push"
                },
                "branch": "main"
            })))
            .respond_with(
                ResponseTemplate::new(201).set_body_json(json!({"number": 17, "state": "created"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let body = client(&server, None)
            .trigger(&request("refs/heads/main"))
            .await
            .unwrap();
        assert_eq!(body["number"], 17);
    }

    #[tokio::test]
    async fn tag_body_has_no_branch() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(body_json(json!({
                "parameters": {
                    "GHA_Actor": "octocat",
                    "GHA_Action": "trigger",
                    "GHA_Event": "push"
                },
                "tag": "v1.2.3"
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        client(&server, None)
            .trigger(&request("refs/tags/v1.2.3"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn non_json_success_body_is_returned_as_string() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("accepted"))
            .mount(&server)
            .await;

        let body = client(&server, None)
            .trigger(&request("refs/heads/main"))
            .await
            .unwrap();
        assert_eq!(body, Value::String("accepted".into()));
    }

    #[tokio::test]
    async fn error_status_is_reported_with_body() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403).set_body_string("Permission denied"))
            .mount(&server)
            .await;

        let err = client(&server, None)
            .trigger(&request("refs/heads/main"))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            DispatchError::Status {
                status: 403,
                body: "Permission denied".into()
            }
        );
    }

    #[tokio::test]
    async fn slow_response_is_a_timeout() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;

        let err = client(&server, Some(Duration::from_millis(50)))
            .trigger(&request("refs/heads/main"))
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::Timeout { .. }), "got {err:?}");
        assert!(!err.retry_policy().is_retryable());
    }

    #[tokio::test]
    async fn unreachable_host_is_a_network_error() {
        // Nothing listens on port 1; the connection is refused.
        let client = CircleCiClient::new(
            ApiToken::new("t").unwrap(),
            ClientOptions {
                base_url: "http://127.0.0.1:1".into(),
                timeout: None,
            },
        )
        .unwrap();
        let err = client.trigger(&request("refs/heads/main")).await.unwrap_err();
        assert!(matches!(err, DispatchError::Network { .. }), "got {err:?}");
        assert!(err.retry_policy().is_retryable());
    }
}
