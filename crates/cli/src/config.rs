//! Command-line and environment configuration.
//!
//! Every setting has an environment fallback, so under GitHub Actions the
//! binary runs without flags. Inputs that describe the workflow run are read
//! as optional here and validated in [`Config::request_context`], which
//! reports a missing value by the variable that should have carried it.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use circleci::{ApiToken, ClientOptions, RetryConfig, DEFAULT_BASE_URL};
use clap::{Parser, ValueEnum};
use trigger::{ActionName, ActorLogin, EventName, GitRef, RequestContext, TriggerError};

use crate::event::EventPayload;

/// Log line format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Plain single-line text.
    Text,
    /// One JSON object per line.
    Json,
}

/// Triggers a CircleCI pipeline for the current GitHub Actions run.
#[derive(Debug, Parser)]
#[command(name = "circleci-trigger", version)]
pub struct Config {
    /// CircleCI personal API token.
    #[arg(long, env = "CCI_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Path of the JSON event payload written by the runner.
    #[arg(long, env = "GITHUB_EVENT_PATH")]
    pub event_path: Option<PathBuf>,

    /// Ref that triggered the workflow.
    #[arg(long = "ref", env = "GITHUB_REF")]
    pub github_ref: Option<String>,

    /// Branch or ref to build instead of the triggering ref.
    #[arg(long = "branch", env = "GHA_Branch")]
    pub branch_override: Option<String>,

    /// Login of the user or app that caused the run.
    #[arg(long, env = "GITHUB_ACTOR")]
    pub actor: Option<String>,

    /// Name of the triggering event.
    #[arg(long, env = "GITHUB_EVENT_NAME")]
    pub event_name: Option<String>,

    /// Identifier of the running action step.
    #[arg(long, env = "GITHUB_ACTION")]
    pub action: Option<String>,

    /// Free-form metadata passed to the pipeline as `GHA_Meta`.
    #[arg(long, env = "INPUT_GHA_META")]
    pub meta: Option<String>,

    /// CircleCI API host.
    #[arg(long, env = "CCI_API_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub api_base_url: String,

    /// Retries after the first failed attempt.
    #[arg(long, env = "CCI_MAX_RETRIES", default_value_t = RetryConfig::DEFAULT.max_retries)]
    pub max_retries: u32,

    /// Seconds to wait before each retry.
    #[arg(long, env = "CCI_RETRY_DELAY_SECS", default_value_t = RetryConfig::DEFAULT.delay.as_secs())]
    pub retry_delay_secs: u64,

    /// Per-request timeout in seconds. Timed-out requests are not retried.
    #[arg(long, env = "CCI_REQUEST_TIMEOUT_SECS")]
    pub request_timeout_secs: Option<u64>,

    /// Log line format.
    #[arg(long, env = "CCI_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

impl Config {
    /// The ref to build: a non-empty `GHA_Branch` wins over `GITHUB_REF`.
    pub fn effective_ref(&self) -> Option<&str> {
        non_empty(self.branch_override.as_deref()).or(non_empty(self.github_ref.as_deref()))
    }

    /// Collects every workflow-run input into one immutable context.
    ///
    /// This is the only place the event payload file is read.
    pub fn request_context(&self) -> anyhow::Result<RequestContext> {
        let event_path = self
            .event_path
            .as_deref()
            .filter(|p| !p.as_os_str().is_empty())
            .ok_or_else(|| TriggerError::missing("GITHUB_EVENT_PATH"))?;
        let payload = EventPayload::load(event_path)?;
        let repository_url = payload
            .repository_url()
            .ok_or_else(|| TriggerError::missing("repository.url"))
            .context("Event payload does not describe a repository")?;

        let git_ref = self
            .effective_ref()
            .and_then(GitRef::new)
            .ok_or_else(|| TriggerError::missing("GITHUB_REF"))?;
        let actor = self
            .actor
            .as_deref()
            .and_then(ActorLogin::new)
            .ok_or_else(|| TriggerError::missing("GITHUB_ACTOR"))?;
        let event_name = self
            .event_name
            .as_deref()
            .and_then(EventName::new)
            .ok_or_else(|| TriggerError::missing("GITHUB_EVENT_NAME"))?;
        let action_name = self
            .action
            .as_deref()
            .and_then(ActionName::new)
            .ok_or_else(|| TriggerError::missing("GITHUB_ACTION"))?;

        Ok(RequestContext::new(
            repository_url,
            git_ref,
            actor,
            event_name,
            action_name,
            self.meta.clone(),
        ))
    }

    /// The API token.
    pub fn api_token(&self) -> Result<ApiToken, TriggerError> {
        self.token
            .as_deref()
            .and_then(ApiToken::new)
            .ok_or_else(|| TriggerError::missing("CCI_TOKEN"))
    }

    /// HTTP client settings: API host and optional request timeout.
    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            base_url: self.api_base_url.clone(),
            timeout: self.request_timeout_secs.map(Duration::from_secs),
        }
    }

    /// Retry bounds for the dispatch.
    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig::new(self.max_retries, Duration::from_secs(self.retry_delay_secs))
    }
}
