//! Pipeline-trigger domain.
//!
//! This crate turns the context of a GitHub Actions run into a CircleCI
//! pipeline-trigger request, and defines how failed attempts are classified.
//! It performs no I/O: environment reads live in `cli`, HTTP lives in
//! `circleci`.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Newtype identifiers (`OrgName`, `BranchName`, `ActorLogin`, etc.) |
//! | [`context`] | `RequestContext`, `ProjectSlug`, `TriggerTarget` |
//! | [`payload`] | `TriggerPayload`, `TriggerRequest` |
//! | [`errors`] | Error types and the retry predicate |
//! | [`ports`] | The `PipelineTrigger` trait |

pub mod context;
pub mod errors;
pub mod identifiers;
pub mod payload;
pub mod ports;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use context::{ProjectSlug, RequestContext, TriggerTarget, BRANCH_REF_PREFIX, TAG_REF_PREFIX};
pub use errors::{retry_policy_for, DispatchError, RetryPolicy, TriggerError};
pub use identifiers::{
    ActionName, ActorLogin, BranchName, EventName, GitRef, OrgName, RepoName, TagName,
};
pub use payload::{
    TriggerPayload, TriggerRequest, PARAM_ACTION, PARAM_ACTOR, PARAM_EVENT, PARAM_META,
};
pub use ports::PipelineTrigger;
