//! The pipeline-trigger request body and the request it travels in.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::{ActorLogin, ProjectSlug, RequestContext, TriggerError, TriggerTarget};

/// Pipeline parameter carrying the actor login.
pub const PARAM_ACTOR: &str = "GHA_Actor";

/// Pipeline parameter carrying the running action's identifier.
pub const PARAM_ACTION: &str = "GHA_Action";

/// Pipeline parameter carrying the triggering event name.
pub const PARAM_EVENT: &str = "GHA_Event";

/// Pipeline parameter carrying the optional free-form metadata.
pub const PARAM_META: &str = "GHA_Meta";

// ---------------------------------------------------------------------------
// Payload
// ---------------------------------------------------------------------------

/// JSON body of the pipeline-trigger call.
///
/// ```json
/// { "parameters": { "GHA_Actor": "...", ... }, "branch": "main" }
/// ```
///
/// The target is flattened so that exactly one of `branch` or `tag` appears
/// at the top level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TriggerPayload {
    parameters: BTreeMap<String, String>,
    #[serde(flatten)]
    target: TriggerTarget,
}

impl TriggerPayload {
    /// Builds the body for a context.
    ///
    /// `GHA_Actor`, `GHA_Action` and `GHA_Event` are always present;
    /// `GHA_Meta` only when the context carries metadata.
    pub fn from_context(context: &RequestContext) -> Self {
        let mut parameters = BTreeMap::new();
        parameters.insert(PARAM_ACTOR.to_owned(), context.actor().to_string());
        parameters.insert(PARAM_ACTION.to_owned(), context.action_name().to_string());
        parameters.insert(PARAM_EVENT.to_owned(), context.event_name().to_string());
        if let Some(meta) = context.meta() {
            parameters.insert(PARAM_META.to_owned(), meta.to_owned());
        }
        Self {
            parameters,
            target: context.target(),
        }
    }

    /// The pipeline parameters.
    pub fn parameters(&self) -> &BTreeMap<String, String> {
        &self.parameters
    }

    /// The branch or tag to build.
    pub fn target(&self) -> &TriggerTarget {
        &self.target
    }
}

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// Everything a transport needs to send one trigger call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerRequest {
    /// Project whose pipeline is triggered.
    pub project: ProjectSlug,
    /// Sent in both attribution headers.
    pub actor: ActorLogin,
    /// Request body.
    pub payload: TriggerPayload,
}

impl TriggerRequest {
    /// Derives the request from the invocation context.
    ///
    /// # Errors
    ///
    /// [`TriggerError::MalformedRepositoryUrl`] if the project cannot be
    /// extracted from the repository URL.
    pub fn from_context(context: &RequestContext) -> Result<Self, TriggerError> {
        let project = context.project()?;
        let request = Self {
            project,
            actor: context.actor().clone(),
            payload: TriggerPayload::from_context(context),
        };
        tracing::debug!(
            project = %request.project,
            target = %request.payload.target(),
            "Derived pipeline trigger request"
        );
        Ok(request)
    }
}
