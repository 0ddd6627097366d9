//! Conversion between release branch names and comparable version tokens.
//!
//! A release branch is any branch named `<prefix><version>`, e.g.
//! `release/2024.3.1` under the prefix `release/`. The version part is
//! compared with semantic version precedence so that `2024.10.0` sorts after
//! `2024.9.0`.
use semver::{BuildMetadata, Version};
use std::{cmp::Ordering, fmt};

/// Comparable version token derived from a release branch name.
///
/// Keeps the exact text that followed the prefix so the exact branch
/// name can always be reconstructed, while ordering and equality use
/// semantic version precedence only (build metadata is ignored).
#[derive(Debug, Clone)]
pub struct ReleaseVersion {
    raw: String,
    precedence: Version,
}

impl ReleaseVersion {
    /// Parses the version portion of a release branch name.
    ///
    /// Accepts full semantic versions as well as the `MAJOR` and
    /// `MAJOR.MINOR` shorthands, which compare as `MAJOR.0.0` and
    /// `MAJOR.MINOR.0`. Shorthands cannot carry pre-release or build suffixes.
    pub fn parse(raw: &str) -> Option<Self> {
        let mut precedence = parse_lenient(raw)?;
        precedence.build = BuildMetadata::EMPTY;
        Some(Self {
            raw: raw.to_string(),
            precedence,
        })
    }

    /// The text exactly as it appeared after the branch prefix.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Semantic version used for ordering.
    pub fn semver(&self) -> &Version {
        &self.precedence
    }
}

fn parse_lenient(raw: &str) -> Option<Version> {
    if raw.is_empty() {
        return None;
    }

    let core_end = raw.find(['-', '+']).unwrap_or(raw.len());
    let (core, suffix) = raw.split_at(core_end);
    let segments = core.split('.').count();

    match (segments, suffix.is_empty()) {
        (3, _) => Version::parse(raw).ok(),
        (1, true) => Version::parse(&format!("{core}.0.0")).ok(),
        (2, true) => Version::parse(&format!("{core}.0")).ok(),
        _ => None,
    }
}

impl PartialEq for ReleaseVersion {
    fn eq(&self, other: &Self) -> bool {
        self.precedence == other.precedence
    }
}

impl Eq for ReleaseVersion {}

impl PartialOrd for ReleaseVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ReleaseVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.precedence.cmp(&other.precedence)
    }
}

impl fmt::Display for ReleaseVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

/// Converts a branch name into a version token.
///
/// Returns `None` when the branch does not start with `prefix` or when the
/// remainder is not a version.
pub fn to_version(branch_name: &str, prefix: &str) -> Option<ReleaseVersion> {
    branch_name
        .strip_prefix(prefix)
        .and_then(ReleaseVersion::parse)
}

/// Converts a version token back into its branch name.
pub fn to_branch_name(version: &ReleaseVersion, prefix: &str) -> String {
    format!("{prefix}{}", version.as_str())
}
