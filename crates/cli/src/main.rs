//! circleci-trigger entry point.
//!
//! This binary is the composition root. Responsibilities:
//!
//! 1. **Parse configuration**: flags with environment fallbacks ([`config`]).
//! 2. **Wire observability**: a `tracing-subscriber` fmt layer on stdout,
//!    text or JSON ([`observability`]).
//! 3. **Build the context**: read the event payload and workflow variables
//!    once into a [`trigger::RequestContext`].
//! 4. **Dispatch**: construct a [`circleci::CircleCiClient`], wrap it in a
//!    [`circleci::TriggerDispatcher`], and send the trigger.
//! 5. **Report**: fold output into "preparing", "success" or "failure" log
//!    groups and exit non-zero on any failure.

mod config;
mod event;
mod observability;
mod workflow;

use std::process::ExitCode;

use anyhow::Context;
use circleci::{CircleCiClient, DispatchReport, TriggerDispatcher};
use clap::Parser;
use tracing::info;
use trigger::{TriggerRequest, TriggerTarget};

use crate::config::{Config, LogFormat};
use crate::workflow::{LogGroup, WorkflowCommand};

const PREPARING_GROUP: &str = "Preparing CircleCI Pipeline Trigger";
const SUCCESS_GROUP: &str = "Successfully triggered CircleCI Pipeline";
const FAILURE_GROUP: &str = "Failed to trigger CircleCI Pipeline";

#[tokio::main]
async fn main() -> ExitCode {
    let config = match Config::try_parse() {
        Ok(config) => config,
        // --help and --version
        Err(err) if !err.use_stderr() => err.exit(),
        Err(err) => {
            // No format was parsed; text keeps the failure group readable.
            if let Err(init_err) = observability::init(LogFormat::Text) {
                eprintln!("{init_err:#}");
            }
            return exit_code_for(Err(err.into()));
        }
    };

    if let Err(err) = observability::init(config.log_format) {
        eprintln!("{err:#}");
    }

    exit_code_for(run(&config).await)
}

/// Reports the outcome in the "success" or "failure" group and maps it to the
/// process exit status.
fn exit_code_for(result: anyhow::Result<DispatchReport>) -> ExitCode {
    match result {
        Ok(report) => {
            let _group = LogGroup::start(SUCCESS_GROUP);
            info!(
                attempts = report.attempts,
                "CircleCI API Response: {}", report.response
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            report_failure(&err);
            ExitCode::FAILURE
        }
    }
}

/// Prepares the request inside the "preparing" group, then dispatches it.
async fn run(config: &Config) -> anyhow::Result<DispatchReport> {
    let (request, dispatcher) = {
        let _group = LogGroup::start(PREPARING_GROUP);
        let (request, client) = prepare(config)?;
        let dispatcher = TriggerDispatcher::new(client, config.retry_config());
        let retry = dispatcher.retry_config();
        info!(
            "Retrying up to {} times, {}s apart",
            retry.max_retries,
            retry.delay.as_secs()
        );
        (request, dispatcher)
    };

    Ok(dispatcher.dispatch(&request).await?)
}

fn prepare(config: &Config) -> anyhow::Result<(TriggerRequest, CircleCiClient)> {
    let context = config.request_context()?;
    info!("URL: {}", context.repository_url());

    let request = TriggerRequest::from_context(&context)?;
    info!("Org: {}", request.project.org());
    info!("Repo: {}", request.project.repo());

    let client = CircleCiClient::new(config.api_token()?, config.client_options())
        .context("Failed to build HTTP client")?;

    info!("Triggering CircleCI Pipeline for {}", request.project);
    info!("Triggering URL: {}", client.pipeline_url(&request.project));
    match request.payload.target() {
        TriggerTarget::Branch(branch) => info!("Triggering branch: {branch}"),
        TriggerTarget::Tag(tag) => info!("Triggering tag: {tag}"),
    }
    info!(
        "Parameters:\n{}",
        serde_json::to_string(request.payload.parameters())?
    );

    Ok((request, client))
}

fn report_failure(err: &anyhow::Error) {
    let _group = LogGroup::start(FAILURE_GROUP);
    tracing::error!(error = ?err, "Pipeline trigger failed");
    failure_annotation(err).issue();
}

fn failure_annotation(err: &anyhow::Error) -> WorkflowCommand {
    WorkflowCommand::error(format!("{err:#}")).property("title", FAILURE_GROUP)
}
