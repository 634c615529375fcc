//! Version-selection policy

use serde::{Deserialize, Serialize};

/// How the update target tag is chosen for a container.
///
/// Exactly one policy is active per pass; it applies to every container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VersionPolicy {
    /// Always pull the floating `latest` tag
    #[default]
    Latest,
    /// Newest minor or patch release within the current major
    MinorAndPatch,
    /// Newest release, crossing major versions when one exists
    Major,
    /// Newest patch release within the current major.minor
    PatchOnly,
}

impl VersionPolicy {
    /// Derive the policy from the configuration flags.
    ///
    /// Returns `None` when `allow_major` and `patch_only` are both set,
    /// since no single policy satisfies both.
    pub fn from_flags(semver: bool, allow_major: bool, patch_only: bool) -> Option<Self> {
        match (semver, allow_major, patch_only) {
            (false, _, _) => Some(VersionPolicy::Latest),
            (true, true, true) => None,
            (true, true, false) => Some(VersionPolicy::Major),
            (true, false, true) => Some(VersionPolicy::PatchOnly),
            (true, false, false) => Some(VersionPolicy::MinorAndPatch),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            VersionPolicy::Latest => "latest",
            VersionPolicy::MinorAndPatch => "minor_and_patch",
            VersionPolicy::Major => "major",
            VersionPolicy::PatchOnly => "patch_only",
        }
    }

    /// Whether tag resolution needs to ask a registry
    pub fn is_semantic(&self) -> bool {
        *self != VersionPolicy::Latest
    }
}

impl std::fmt::Display for VersionPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
