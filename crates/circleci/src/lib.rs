//! CircleCI infrastructure adapter.
//!
//! Implements the [`trigger::PipelineTrigger`] trait against the CircleCI v2
//! API and wraps it in the [`TriggerDispatcher`], which owns the retry policy.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** HTTP transport, authentication headers, response
//! classification and the inter-attempt delay all live here. The [`trigger`]
//! crate sees only [`trigger::PipelineTrigger`] and [`trigger::DispatchError`].

pub mod client;
pub mod dispatcher;
pub mod retry;

pub use client::{
    ApiToken, CircleCiClient, ClientOptions, ATTRIBUTION_ACTOR_ID_HEADER,
    ATTRIBUTION_LOGIN_HEADER, CIRCLE_TOKEN_HEADER, DEFAULT_BASE_URL,
};
pub use dispatcher::{DispatchFailure, DispatchReport, TriggerDispatcher};
pub use retry::{retry_with_fixed_delay, RetryConfig, RetryOutcome};
