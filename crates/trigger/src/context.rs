//! Invocation context and the pure derivations made from it.
//!
//! [`RequestContext`] is assembled once, at start-up, from everything the
//! runner provides. Nothing in this module reads the environment; the
//! derivations ([`ProjectSlug::from_repository_url`], [`TriggerTarget::from_ref`])
//! operate on the values handed to them.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::{
    ActionName, ActorLogin, BranchName, EventName, GitRef, OrgName, RepoName, TagName,
    TriggerError,
};

/// Ref prefix for branches.
pub const BRANCH_REF_PREFIX: &str = "refs/heads/";

/// Ref prefix for tags.
pub const TAG_REF_PREFIX: &str = "refs/tags/";

// Greedy on the organization: everything between `github.com/` (or
// `github.com/repos/`) and the last `/` is the org.
static REPOSITORY_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)github\.com/(repos/)?(.*)/(.*)$").expect("repository URL pattern is valid")
});

// ---------------------------------------------------------------------------
// Request context
// ---------------------------------------------------------------------------

/// Everything the trigger needs to know about the workflow run that invoked it.
///
/// Immutable after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    repository_url: String,
    git_ref: GitRef,
    actor: ActorLogin,
    event_name: EventName,
    action_name: ActionName,
    meta: Option<String>,
}

impl RequestContext {
    /// Creates a context.
    ///
    /// `meta` is trimmed; an empty or whitespace-only value is treated as
    /// absent.
    pub fn new(
        repository_url: impl Into<String>,
        git_ref: GitRef,
        actor: ActorLogin,
        event_name: EventName,
        action_name: ActionName,
        meta: Option<String>,
    ) -> Self {
        let meta = meta
            .map(|m| m.trim().to_owned())
            .filter(|m| !m.is_empty());
        Self {
            repository_url: repository_url.into(),
            git_ref,
            actor,
            event_name,
            action_name,
            meta,
        }
    }

    /// The repository URL from the event payload.
    pub fn repository_url(&self) -> &str {
        &self.repository_url
    }

    /// The ref the pipeline should run against, after any override.
    pub fn git_ref(&self) -> &GitRef {
        &self.git_ref
    }

    /// The user or app that caused the run.
    pub fn actor(&self) -> &ActorLogin {
        &self.actor
    }

    /// The triggering event name.
    pub fn event_name(&self) -> &EventName {
        &self.event_name
    }

    /// The running action's identifier.
    pub fn action_name(&self) -> &ActionName {
        &self.action_name
    }

    /// Free-form metadata supplied to the action, if any.
    pub fn meta(&self) -> Option<&str> {
        self.meta.as_deref()
    }

    /// Extracts the CircleCI project from the repository URL.
    pub fn project(&self) -> Result<ProjectSlug, TriggerError> {
        ProjectSlug::from_repository_url(&self.repository_url)
    }

    /// Classifies the ref into the branch or tag to build.
    pub fn target(&self) -> TriggerTarget {
        TriggerTarget::from_ref(&self.git_ref)
    }
}

// ---------------------------------------------------------------------------
// Project slug
// ---------------------------------------------------------------------------

/// A GitHub-hosted CircleCI project, `gh/{org}/{repo}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProjectSlug {
    org: OrgName,
    repo: RepoName,
}

impl ProjectSlug {
    /// Parses `.../github.com/[repos/]ORG/REPO`.
    ///
    /// Accepts both the web form (`https://github.com/acme/widgets`) and the
    /// REST form found in event payloads
    /// (`https://api.github.com/repos/acme/widgets`).
    ///
    /// # Errors
    ///
    /// [`TriggerError::MalformedRepositoryUrl`] if the URL does not match or
    /// either segment is empty.
    pub fn from_repository_url(url: &str) -> Result<Self, TriggerError> {
        let malformed = || TriggerError::MalformedRepositoryUrl {
            url: url.to_owned(),
        };
        let captures = REPOSITORY_URL.captures(url).ok_or_else(malformed)?;
        let org = captures
            .get(2)
            .and_then(|m| OrgName::new(m.as_str()))
            .ok_or_else(malformed)?;
        let repo = captures
            .get(3)
            .and_then(|m| RepoName::new(m.as_str()))
            .ok_or_else(malformed)?;
        Ok(Self { org, repo })
    }

    /// The organization segment.
    pub fn org(&self) -> &OrgName {
        &self.org
    }

    /// The repository segment.
    pub fn repo(&self) -> &RepoName {
        &self.repo
    }

    /// Path of the pipeline-trigger endpoint, relative to the API host.
    pub fn pipeline_path(&self) -> String {
        format!("api/v2/project/gh/{}/{}/pipeline", self.org, self.repo)
    }
}

impl std::fmt::Display for ProjectSlug {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.org, self.repo)
    }
}

// ---------------------------------------------------------------------------
// Trigger target
// ---------------------------------------------------------------------------

/// What the pipeline is asked to build: exactly one branch or one tag.
///
/// Serialises as a single `"branch"` or `"tag"` key, which is how it appears
/// at the top level of the trigger body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerTarget {
    /// Build a branch.
    Branch(BranchName),
    /// Build a tag.
    Tag(TagName),
}

impl TriggerTarget {
    /// Classifies a ref.
    ///
    /// - `refs/tags/X` → tag `X`
    /// - `refs/heads/X` → branch `X`
    /// - anything else → branch equal to the whole ref
    ///
    /// A prefix with nothing after it falls into the last case.
    pub fn from_ref(git_ref: &GitRef) -> Self {
        let raw = git_ref.as_str();
        if let Some(tag) = raw.strip_prefix(TAG_REF_PREFIX).and_then(|t| TagName::new(t)) {
            return TriggerTarget::Tag(tag);
        }
        match raw
            .strip_prefix(BRANCH_REF_PREFIX)
            .and_then(|b| BranchName::new(b))
        {
            Some(branch) => TriggerTarget::Branch(branch),
            None => TriggerTarget::Branch(git_ref.as_branch()),
        }
    }

    /// The branch, if this target is one.
    pub fn branch(&self) -> Option<&BranchName> {
        match self {
            TriggerTarget::Branch(branch) => Some(branch),
            TriggerTarget::Tag(_) => None,
        }
    }

    /// The tag, if this target is one.
    pub fn tag(&self) -> Option<&TagName> {
        match self {
            TriggerTarget::Tag(tag) => Some(tag),
            TriggerTarget::Branch(_) => None,
        }
    }
}

impl std::fmt::Display for TriggerTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TriggerTarget::Branch(branch) => write!(f, "branch {branch}"),
            TriggerTarget::Tag(tag) => write!(f, "tag {tag}"),
        }
    }
}
