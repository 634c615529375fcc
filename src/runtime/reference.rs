//! Image reference parsing

use std::fmt;

use crate::version::semver::LATEST_TAG;

/// `repository:tag` split of an image reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    pub repository: String,
    pub tag: String,
}

impl ImageReference {
    /// Parse a reference such as `registry:5000/team/app:1.2@sha256:...`.
    ///
    /// Any digest suffix is dropped and a missing tag defaults to `latest`.
    pub fn parse(reference: &str) -> Self {
        let without_digest = strip_digest(reference);

        // A ':' before the last '/' belongs to a registry port, not a tag
        let last_slash = without_digest.rfind('/').map(|i| i + 1).unwrap_or(0);
        match without_digest[last_slash..].rfind(':') {
            Some(colon) => {
                let colon = last_slash + colon;
                Self {
                    repository: without_digest[..colon].to_string(),
                    tag: without_digest[colon + 1..].to_string(),
                }
            }
            None => Self {
                repository: without_digest.to_string(),
                tag: LATEST_TAG.to_string(),
            },
        }
    }
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.repository, self.tag)
    }
}

/// Drop an `@sha256:...` suffix
pub fn strip_digest(reference: &str) -> &str {
    reference
        .split_once('@')
        .map(|(name, _)| name)
        .unwrap_or(reference)
}

/// Split a repository into its registry host (if any) and the path inside it.
///
/// The first component is a host when it contains `.` or `:` or is `localhost`.
pub fn split_registry(repository: &str) -> (Option<&str>, &str) {
    match repository.split_once('/') {
        Some((first, rest))
            if first.contains('.') || first.contains(':') || first == "localhost" =>
        {
            (Some(first), rest)
        }
        _ => (None, repository),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("nginx", "nginx", "latest")]
    #[case("nginx:1.25", "nginx", "1.25")]
    #[case("team/app:v2.0.1", "team/app", "v2.0.1")]
    #[case("registry:5000/team/app", "registry:5000/team/app", "latest")]
    #[case("registry:5000/team/app:3", "registry:5000/team/app", "3")]
    #[case("nginx@sha256:abcd", "nginx", "latest")]
    #[case("ghcr.io/org/app:1.0@sha256:abcd", "ghcr.io/org/app", "1.0")]
    fn parse_splits_repository_and_tag(
        #[case] reference: &str,
        #[case] repository: &str,
        #[case] tag: &str,
    ) {
        let parsed = ImageReference::parse(reference);

        assert_eq!(parsed.repository, repository);
        assert_eq!(parsed.tag, tag);
    }

    #[rstest]
    #[case("nginx", None, "nginx")]
    #[case("team/app", None, "team/app")]
    #[case("ghcr.io/org/app", Some("ghcr.io"), "org/app")]
    #[case("registry:5000/app", Some("registry:5000"), "app")]
    #[case("localhost/app", Some("localhost"), "app")]
    fn split_registry_detects_host_component(
        #[case] repository: &str,
        #[case] host: Option<&str>,
        #[case] path: &str,
    ) {
        assert_eq!(split_registry(repository), (host, path));
    }

    #[test]
    fn display_joins_repository_and_tag() {
        let reference = ImageReference::parse("team/app:1.2");
        assert_eq!(reference.to_string(), "team/app:1.2");
    }
}
