//! Semantic-version tag selection
//!
//! Picks the tag an image should move to from the full list of tags a
//! registry knows about, under a [`VersionPolicy`].

use semver::Version;

use crate::version::policy::VersionPolicy;

/// Floating tag used whenever no semantic choice can be made
pub const LATEST_TAG: &str = "latest";

/// A tag that parsed as a semantic version, keeping its original spelling.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ParsedTag<'a> {
    raw: &'a str,
    version: Version,
}

/// Parse a version string into a semver::Version, normalizing partial versions.
///
/// Strips a leading `v`/`V` and pads partial versions with zeros.
///
/// Examples:
/// - "1" -> Version(1, 0, 0)
/// - "v1.2" -> Version(1, 2, 0)
/// - "1.2.3-alpine" -> Version(1, 2, 3, pre = "alpine")
pub fn parse_version(version: &str) -> Option<Version> {
    let version = version
        .strip_prefix('v')
        .or_else(|| version.strip_prefix('V'))
        .unwrap_or(version);

    // The suffix is split off first so "1.2-alpine" pads to "1.2.0-alpine"
    let (core, suffix) = match version.split_once('-') {
        Some((core, suffix)) => (core, Some(suffix)),
        None => (version, None),
    };

    let parts: Vec<&str> = core.split('.').collect();
    let padded = match parts.len() {
        1 => format!("{}.0.0", parts[0]),
        2 => format!("{}.{}.0", parts[0], parts[1]),
        _ => core.to_string(),
    };

    let normalized = match suffix {
        Some(suffix) => format!("{}-{}", padded, suffix),
        None => padded,
    };
    Version::parse(&normalized).ok()
}

fn parse_tags(candidates: &[String]) -> Vec<ParsedTag<'_>> {
    candidates
        .iter()
        .filter_map(|raw| {
            parse_version(raw).map(|version| ParsedTag {
                raw: raw.as_str(),
                version,
            })
        })
        .collect()
}

/// Pre-release identifiers that mark a release stage rather than an image flavour
const RELEASE_STAGES: &[&str] = &[
    "alpha", "beta", "rc", "pre", "preview", "dev", "snapshot", "canary", "nightly",
];

/// Flavour suffix of a version (`alpine` in `1.2.3-alpine`), if any.
///
/// Release-stage suffixes such as `rc1` or `beta.2` are not flavours.
fn flavour(version: &Version) -> Option<&str> {
    if version.pre.is_empty() {
        return None;
    }
    let first = version.pre.as_str().split('.').next().unwrap_or_default();
    let first = first.to_ascii_lowercase();
    if RELEASE_STAGES.iter().any(|stage| first.starts_with(stage)) {
        None
    } else {
        Some(version.pre.as_str())
    }
}

fn is_release_stage(version: &Version) -> bool {
    !version.pre.is_empty() && flavour(version).is_none()
}

fn core(version: &Version) -> (u64, u64, u64) {
    (version.major, version.minor, version.patch)
}

/// Highest tag satisfying `predicate`, keeping the original spelling
fn highest_where<'a>(
    tags: &[&ParsedTag<'a>],
    predicate: impl Fn(&Version) -> bool,
) -> Option<&'a str> {
    tags.iter()
        .filter(|tag| predicate(&tag.version))
        .max_by(|a, b| a.version.cmp(&b.version))
        .map(|tag| tag.raw)
}

/// Select the tag to pull for an image currently running `current_tag`.
///
/// Candidates must carry the current tag's flavour suffix (`-alpine`,
/// `-slim`, ...). When no candidate has that flavour, plain releases are used
/// and compared by their numeric core. Release-stage tags (`-rc1`, `-beta`)
/// are only candidates while the current tag is itself one, so a release
/// candidate moves on to the final release.
///
/// Returns [`LATEST_TAG`] only when no candidate is a semantic version, and
/// the current tag itself when nothing strictly newer is allowed by the policy.
pub fn select_tag(current_tag: &str, candidates: &[String], policy: VersionPolicy) -> String {
    if policy == VersionPolicy::Latest {
        return LATEST_TAG.to_string();
    }

    let parsed = parse_tags(candidates);
    if parsed.is_empty() {
        return LATEST_TAG.to_string();
    }

    let Some(current) = parse_version(current_tag) else {
        // Not a semantic version: prefer the highest plain release
        let all: Vec<&ParsedTag<'_>> = parsed.iter().collect();
        return highest_where(&all, |v| v.pre.is_empty())
            .or_else(|| highest_where(&all, |_| true))
            .unwrap_or(LATEST_TAG)
            .to_string();
    };

    let current_flavour = flavour(&current);
    let accepts_stages = is_release_stage(&current);

    let same_flavour: Vec<&ParsedTag<'_>> = parsed
        .iter()
        .filter(|tag| match current_flavour {
            Some(wanted) => flavour(&tag.version) == Some(wanted),
            None => {
                tag.version.pre.is_empty() || (accepts_stages && is_release_stage(&tag.version))
            }
        })
        .collect();

    let (eligible, cross_flavour) = if same_flavour.is_empty() {
        let plain: Vec<&ParsedTag<'_>> =
            parsed.iter().filter(|tag| tag.version.pre.is_empty()).collect();
        (plain, true)
    } else {
        (same_flavour, false)
    };

    let newer = |v: &Version| {
        if cross_flavour {
            core(v) > core(&current)
        } else {
            *v > current
        }
    };
    let same_major = || highest_where(&eligible, |v| v.major == current.major && newer(v));

    let selected = match policy {
        VersionPolicy::Latest => None,
        VersionPolicy::Major => {
            highest_where(&eligible, |v| v.major > current.major).or_else(same_major)
        }
        VersionPolicy::PatchOnly => highest_where(&eligible, |v| {
            v.major == current.major && v.minor == current.minor && newer(v)
        }),
        VersionPolicy::MinorAndPatch => same_major(),
    };

    selected.unwrap_or(current_tag).to_string()
}
