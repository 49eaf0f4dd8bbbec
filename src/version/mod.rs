//! # Version Classifier
//!
//! Parses ref names into their semantic components and resolves the highest
//! patch of a series.
//!
//! Only names matching `vMAJOR`, `vMAJOR.MINOR`, `vMAJOR.MINOR.PATCH` or the
//! literal `latest` are version references. Everything else (`main`,
//! `v1.0.0-beta`, `release/1`) is invisible to the rules.
//!
//! ```rust
//! use versionlens::version::{parse_version, VersionKind};
//!
//! let parsed = parse_version("v1.2").unwrap();
//! assert_eq!(parsed.kind, VersionKind::Minor);
//! assert_eq!((parsed.major, parsed.minor), (Some(1), Some(2)));
//!
//! assert!(parse_version("v1.0.0-beta").is_none());
//! ```

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of the floating alias that tracks the globally highest patch
pub const LATEST: &str = "latest";

lazy_static! {
    static ref VERSION_PATTERN: Regex =
        Regex::new(r"^v(\d+)(\.(\d+)(\.(\d+))?)?$").expect("version pattern is valid");
}

/// Kind of git ref a version lives on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefType {
    Tag,
    Branch,
}

impl RefType {
    /// The other ref kind
    pub fn opposite(self) -> Self {
        match self {
            RefType::Tag => RefType::Branch,
            RefType::Branch => RefType::Tag,
        }
    }

    /// Fully qualified ref path for a short name
    pub fn ref_path(self, name: &str) -> String {
        match self {
            RefType::Tag => format!("refs/tags/{}", name),
            RefType::Branch => format!("refs/heads/{}", name),
        }
    }
}

impl fmt::Display for RefType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefType::Tag => write!(f, "tag"),
            RefType::Branch => write!(f, "branch"),
        }
    }
}

/// Structural classification of a version name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionKind {
    Major,
    Minor,
    Patch,
    Latest,
}

impl VersionKind {
    /// Major, minor and `latest` aliases move; patches do not
    pub fn is_floating(self) -> bool {
        !matches!(self, VersionKind::Patch)
    }
}

/// Result of parsing a version name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedVersion {
    pub kind: VersionKind,
    pub major: Option<u64>,
    pub minor: Option<u64>,
    pub patch: Option<u64>,
}

/// Parse a ref name into its version components.
///
/// Returns `None` for names that are not version references. Components
/// that overflow `u64` are treated as non-versions.
pub fn parse_version(name: &str) -> Option<ParsedVersion> {
    if name == LATEST {
        return Some(ParsedVersion {
            kind: VersionKind::Latest,
            major: None,
            minor: None,
            patch: None,
        });
    }

    let caps = VERSION_PATTERN.captures(name)?;
    let number = |idx: usize| -> Option<Option<u64>> {
        match caps.get(idx) {
            Some(m) => m.as_str().parse::<u64>().ok().map(Some),
            None => Some(None),
        }
    };

    let major = number(1)?;
    let minor = number(3)?;
    let patch = number(5)?;

    let kind = match (minor, patch) {
        (None, _) => VersionKind::Major,
        (Some(_), None) => VersionKind::Minor,
        (Some(_), Some(_)) => VersionKind::Patch,
    };

    Some(ParsedVersion {
        kind,
        major,
        minor,
        patch,
    })
}

/// A named pointer (tag or branch) to a commit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionRef {
    /// Short name, e.g. `v1`, `v1.2.3`, `latest`
    pub version: String,
    /// Fully qualified path, e.g. `refs/tags/v1`
    pub ref_path: String,
    /// Commit the ref points at
    pub sha: String,
    pub ref_type: RefType,
    pub kind: VersionKind,
    pub major: Option<u64>,
    pub minor: Option<u64>,
    pub patch: Option<u64>,
    /// Matches a configured ignore-versions pattern
    #[serde(default)]
    pub is_ignored: bool,
}

impl VersionRef {
    /// Build a version ref, or `None` if the name is not a version reference
    pub fn new(name: &str, sha: impl Into<String>, ref_type: RefType) -> Option<Self> {
        let parsed = parse_version(name)?;
        Some(Self {
            version: name.to_string(),
            ref_path: ref_type.ref_path(name),
            sha: sha.into(),
            ref_type,
            kind: parsed.kind,
            major: parsed.major,
            minor: parsed.minor,
            patch: parsed.patch,
            is_ignored: false,
        })
    }

    pub fn is_major(&self) -> bool {
        self.kind == VersionKind::Major
    }

    pub fn is_minor(&self) -> bool {
        self.kind == VersionKind::Minor
    }

    pub fn is_patch(&self) -> bool {
        self.kind == VersionKind::Patch
    }

    pub fn is_latest(&self) -> bool {
        self.kind == VersionKind::Latest
    }

    pub fn is_floating(&self) -> bool {
        self.kind.is_floating()
    }

    /// `(major, minor, patch)` for patch versions
    pub fn triple(&self) -> Option<(u64, u64, u64)> {
        match (self.major, self.minor, self.patch) {
            (Some(major), Some(minor), Some(patch)) => Some((major, minor, patch)),
            _ => None,
        }
    }
}

/// Name of the major alias for a series, e.g. `v1`
pub fn major_name(major: u64) -> String {
    format!("v{}", major)
}

/// Name of the minor alias for a series, e.g. `v1.2`
pub fn minor_name(major: u64, minor: u64) -> String {
    format!("v{}.{}", major, minor)
}

/// Select the patch with the greatest `(major, minor, patch)` among `refs`.
///
/// Non-patch refs are skipped. On an identical triple the tag wins over the
/// branch, and otherwise the earlier ref in iteration order wins.
pub fn highest_patch<'a, I>(refs: I) -> Option<&'a VersionRef>
where
    I: IntoIterator<Item = &'a VersionRef>,
{
    let mut best: Option<&VersionRef> = None;

    for candidate in refs {
        let Some(triple) = candidate.triple() else {
            continue;
        };

        best = match best {
            None => Some(candidate),
            Some(current) => {
                let current_triple = current.triple().unwrap_or_default();
                let replace = triple > current_triple
                    || (triple == current_triple
                        && current.ref_type == RefType::Branch
                        && candidate.ref_type == RefType::Tag);
                if replace {
                    Some(candidate)
                } else {
                    Some(current)
                }
            }
        };
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag(name: &str, sha: &str) -> VersionRef {
        VersionRef::new(name, sha, RefType::Tag).unwrap()
    }

    fn branch(name: &str, sha: &str) -> VersionRef {
        VersionRef::new(name, sha, RefType::Branch).unwrap()
    }

    #[test]
    fn test_parse_major_minor_patch() {
        let major = parse_version("v3").unwrap();
        assert_eq!(major.kind, VersionKind::Major);
        assert_eq!(major.major, Some(3));
        assert_eq!(major.minor, None);

        let minor = parse_version("v3.1").unwrap();
        assert_eq!(minor.kind, VersionKind::Minor);
        assert_eq!(minor.minor, Some(1));
        assert_eq!(minor.patch, None);

        let patch = parse_version("v3.1.4").unwrap();
        assert_eq!(patch.kind, VersionKind::Patch);
        assert_eq!(patch.patch, Some(4));
    }

    #[test]
    fn test_parse_latest() {
        let latest = parse_version("latest").unwrap();
        assert_eq!(latest.kind, VersionKind::Latest);
        assert_eq!(latest.major, None);
    }

    #[test]
    fn test_parse_rejects_non_versions() {
        for name in [
            "main",
            "v1.0.0-beta",
            "1.0.0",
            "v",
            "v1.",
            "v1.2.3.4",
            "V1",
            "latest-v1",
            "v99999999999999999999999",
        ] {
            assert!(parse_version(name).is_none(), "{} should not parse", name);
        }
    }

    #[test]
    fn test_exactly_one_kind_flag_set() {
        for name in ["v1", "v1.2", "v1.2.3"] {
            let r = tag(name, "abc");
            let flags = [r.is_major(), r.is_minor(), r.is_patch()];
            assert_eq!(flags.iter().filter(|f| **f).count(), 1, "{}", name);
        }

        let latest = tag("latest", "abc");
        assert!(!latest.is_major() && !latest.is_minor() && !latest.is_patch());
        assert!(latest.is_floating());
    }

    #[test]
    fn test_ref_path() {
        assert_eq!(tag("v1", "a").ref_path, "refs/tags/v1");
        assert_eq!(branch("v1", "a").ref_path, "refs/heads/v1");
    }

    #[test]
    fn test_highest_patch_uses_numeric_ordering() {
        let refs = vec![tag("v1.9.0", "a"), tag("v1.10.0", "b"), tag("v1.2.0", "c")];
        assert_eq!(highest_patch(&refs).unwrap().version, "v1.10.0");
    }

    #[test]
    fn test_highest_patch_skips_floating() {
        let refs = vec![tag("v2", "a"), tag("latest", "b"), tag("v1.0.0", "c")];
        assert_eq!(highest_patch(&refs).unwrap().sha, "c");
    }

    #[test]
    fn test_highest_patch_prefers_tag_on_tie() {
        let refs = vec![branch("v1.0.0", "from-branch"), tag("v1.0.0", "from-tag")];
        assert_eq!(highest_patch(&refs).unwrap().sha, "from-tag");

        let refs = vec![tag("v1.0.0", "from-tag"), branch("v1.0.0", "from-branch")];
        assert_eq!(highest_patch(&refs).unwrap().sha, "from-tag");
    }

    #[test]
    fn test_highest_patch_empty() {
        let refs: Vec<VersionRef> = vec![tag("v1", "a")];
        assert!(highest_patch(&refs).is_none());
    }
}
