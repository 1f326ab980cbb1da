//! Dotted version handling.
//!
//! Package descriptors carry free-form version strings (`1.2`, `2.0.0`,
//! `v1.4.0-beta2`, `1.0.0.1`), and none of them has to be valid semver:
//! versions split into numeric and tag segments compared left to right.
//! Missing trailing segments count as zero, and a trailing tag ranks
//! `dev < alpha < beta < rc < release < patch-level`.
//!
//! `semver` is not used: it rejects four-segment versions and orders `pl`
//! and `dev` tags as plain pre-releases, so even a lenient wrapper would
//! misrank patch-level releases.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Version used when a descriptor declares none.
pub const DEFAULT_VERSION: &str = "0.0.0";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Num(u64),
    /// Pre-release or patch-level marker, by rank.
    Tag(i8),
}

const RELEASE_RANK: i8 = 4;

impl Segment {
    fn rank(&self) -> i8 {
        match self {
            Segment::Num(_) => RELEASE_RANK,
            Segment::Tag(r) => *r,
        }
    }
}

fn tag_rank(tag: &str) -> i8 {
    match tag.to_ascii_lowercase().as_str() {
        "dev" => 0,
        "alpha" | "a" => 1,
        "beta" | "b" => 2,
        "rc" => 3,
        "pl" | "p" | "patch" => 5,
        _ => -1,
    }
}

/// A parsed dotted version. Keeps the original text for display.
#[derive(Debug, Clone)]
pub struct Version {
    raw: String,
    segments: Vec<Segment>,
}

impl Version {
    /// Parse a version string. Never fails; garbage compares lowest.
    pub fn parse(s: &str) -> Self {
        let raw = s.trim().to_string();
        let body = raw
            .strip_prefix('v')
            .or_else(|| raw.strip_prefix('V'))
            .unwrap_or(&raw);

        let mut segments = Vec::new();
        for part in body.split(['.', '-', '_', '+']) {
            if part.is_empty() {
                continue;
            }
            // Split runs like `beta2` or `1rc` into separate segments.
            let mut rest = part;
            while !rest.is_empty() {
                let digits = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
                if digits > 0 {
                    let n = rest[..digits].parse().unwrap_or(u64::MAX);
                    segments.push(Segment::Num(n));
                    rest = &rest[digits..];
                } else {
                    let letters = rest.find(|c: char| c.is_ascii_digit()).unwrap_or(rest.len());
                    segments.push(Segment::Tag(tag_rank(&rest[..letters])));
                    rest = &rest[letters..];
                }
            }
        }

        Version { raw, segments }
    }

    /// The version as written.
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl Default for Version {
    fn default() -> Self {
        Version::parse(DEFAULT_VERSION)
    }
}

impl From<&str> for Version {
    fn from(s: &str) -> Self {
        Version::parse(s)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.segments.len().max(other.segments.len());
        for i in 0..len {
            let ord = match (self.segments.get(i), other.segments.get(i)) {
                (Some(Segment::Num(a)), Some(Segment::Num(b))) => a.cmp(b),
                (Some(a), Some(b)) => a.rank().cmp(&b.rank()),
                // A missing segment is an implicit `0` against a number and a
                // plain release against a tag.
                (Some(Segment::Num(a)), None) => a.cmp(&0),
                (None, Some(Segment::Num(b))) => 0.cmp(b),
                (Some(a), None) => a.rank().cmp(&RELEASE_RANK),
                (None, Some(b)) => RELEASE_RANK.cmp(&b.rank()),
                (None, None) => Ordering::Equal,
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Version::parse(&s))
    }
}
