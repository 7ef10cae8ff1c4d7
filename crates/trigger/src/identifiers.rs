//! Newtype identifiers for the values extracted from the invoking workflow run.
//!
//! Every piece of trigger context that ends up in the outbound request is a
//! distinct newtype wrapping a `String`. This prevents accidentally sending an
//! [`ActorLogin`] where a [`BranchName`] is expected, even though both are
//! plain strings on the wire.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Macro for String-wrapped newtypes.
// Generates: struct, new() returning Option<Self>, as_str(), Display.
// ---------------------------------------------------------------------------
macro_rules! string_id {
    (
        $(#[$attr:meta])*
        $name:ident
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier, returning `None` if the value is empty.
            pub fn new(value: impl Into<String>) -> Option<Self> {
                let v = value.into();
                if v.is_empty() { None } else { Some(Self(v)) }
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Identifiers: repository
// ---------------------------------------------------------------------------

string_id! {
    /// The GitHub organization (or user) that owns the repository.
    ///
    /// Becomes the `{org}` segment of the CircleCI project slug `gh/{org}/{repo}`.
    OrgName
}

string_id! {
    /// The GitHub repository name, without its owner.
    RepoName
}

// ---------------------------------------------------------------------------
// Identifiers: Git refs
// ---------------------------------------------------------------------------

string_id! {
    /// A fully-qualified Git ref as reported by the runner
    /// (e.g. `"refs/heads/main"`, `"refs/tags/v1.2.3"`, `"refs/pull/7/merge"`).
    GitRef
}

string_id! {
    /// A Git branch name with any `refs/heads/` prefix removed (e.g. `"main"`).
    BranchName
}

string_id! {
    /// A Git tag name with its `refs/tags/` prefix removed (e.g. `"v1.2.3"`).
    TagName
}

impl GitRef {
    /// Reinterprets the whole ref, unchanged, as a branch name.
    ///
    /// Used for refs outside the `refs/heads/` and `refs/tags/` namespaces;
    /// the provider decides what to make of them.
    pub fn as_branch(&self) -> BranchName {
        BranchName(self.0.clone())
    }
}

// ---------------------------------------------------------------------------
// Identifiers: workflow run
// ---------------------------------------------------------------------------

string_id! {
    /// The login of the user or app that caused the workflow run.
    ///
    /// Sent both as the `GHA_Actor` pipeline parameter and in the two
    /// attribution headers.
    ActorLogin
}

string_id! {
    /// The name of the event that triggered the workflow (e.g. `"push"`).
    EventName
}

string_id! {
    /// The identifier of the action step currently running (e.g. `"__run_2"`).
    ActionName
}
