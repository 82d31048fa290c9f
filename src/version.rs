//! Kubernetes version parsing and skew-capped upgrade targets.
//!
//! Versions are compared on (major, minor, patch) only. Pre-release and
//! build suffixes such as `-gke.1100` are accepted and ignored.

use std::fmt;

use thiserror::Error;

/// Where a version string came from, for error reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionSource {
    ControlPlane,
    NodePool(String),
    ServerConfig,
}

impl fmt::Display for VersionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionSource::ControlPlane => write!(f, "cluster control plane"),
            VersionSource::NodePool(name) => write!(f, "node pool {}", name),
            VersionSource::ServerConfig => write!(f, "server config"),
        }
    }
}

/// A version string that could not be parsed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid version format '{input}' for {entity}")]
pub struct VersionParseError {
    pub input: String,
    pub entity: VersionSource,
}

/// (major, minor, patch), ordered lexicographically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VersionTriple {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl VersionTriple {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Parse `1.18.3`, `v1.18`, `1.18.3-gke.1100` and similar.
    pub fn parse(input: &str, source: VersionSource) -> Result<Self, VersionParseError> {
        let err = || VersionParseError {
            input: input.to_string(),
            entity: source.clone(),
        };

        let trimmed = input.trim();
        let trimmed = trimmed
            .strip_prefix('v')
            .or_else(|| trimmed.strip_prefix('V'))
            .unwrap_or(trimmed);
        let core = trimmed.split(['-', '+']).next().unwrap_or_default();

        let parts: Vec<&str> = core.split('.').collect();
        if !(2..=3).contains(&parts.len()) {
            return Err(err());
        }

        let mut numbers = [0u32; 3];
        for (slot, part) in numbers.iter_mut().zip(&parts) {
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(err());
            }
            *slot = part.parse().map_err(|_| err())?;
        }

        Ok(Self::new(numbers[0], numbers[1], numbers[2]))
    }
}

impl fmt::Display for VersionTriple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// True iff `current` is strictly older than `latest`.
pub fn needs_upgrade(current: VersionTriple, latest: VersionTriple) -> bool {
    current < latest
}

/// True when `latest` is more than one minor version ahead of `current`.
///
/// Only minor components are compared; a major rollover is not reconciled.
pub fn exceeds_skew(current: VersionTriple, latest: VersionTriple) -> bool {
    i64::from(latest.minor) - i64::from(current.minor) > 1
}

/// Advance at most one minor version per invocation.
pub fn capped_target(current: VersionTriple, latest: VersionTriple) -> VersionTriple {
    if exceeds_skew(current, latest) {
        VersionTriple::new(current.major, current.minor + 1, 0)
    } else {
        latest
    }
}

/// String-level wrapper around [`needs_upgrade`].
pub fn needs_upgrade_str(
    current: &str,
    current_source: VersionSource,
    latest: &str,
    latest_source: VersionSource,
) -> Result<bool, VersionParseError> {
    Ok(needs_upgrade(
        VersionTriple::parse(current, current_source)?,
        VersionTriple::parse(latest, latest_source)?,
    ))
}

/// String-level wrapper around [`capped_target`].
pub fn capped_target_str(
    current: &str,
    current_source: VersionSource,
    latest: &str,
    latest_source: VersionSource,
) -> Result<VersionTriple, VersionParseError> {
    Ok(capped_target(
        VersionTriple::parse(current, current_source)?,
        VersionTriple::parse(latest, latest_source)?,
    ))
}

/// What an update request asks the control plane to roll to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpgradeTarget {
    /// Skew-capped to the next minor; sent as the `major.minor` alias so the
    /// control plane picks the newest patch of that minor.
    NextMinor(VersionTriple),
    /// Newest available; sent as the `latest` sentinel.
    Latest(VersionTriple),
    /// An exact version string, used when a node pool follows its control plane.
    Exact(VersionTriple, String),
}

impl UpgradeTarget {
    /// Control plane target given the newest valid master version.
    pub fn for_master(current: VersionTriple, latest: VersionTriple) -> Self {
        if exceeds_skew(current, latest) {
            UpgradeTarget::NextMinor(capped_target(current, latest))
        } else {
            UpgradeTarget::Latest(latest)
        }
    }

    /// Node pool target; the control plane version is the ceiling.
    pub fn for_node_pool(pool: VersionTriple, master: VersionTriple, master_raw: &str) -> Self {
        if exceeds_skew(pool, master) {
            UpgradeTarget::NextMinor(capped_target(pool, master))
        } else {
            UpgradeTarget::Exact(master, master_raw.to_string())
        }
    }

    pub fn version(&self) -> VersionTriple {
        match self {
            UpgradeTarget::NextMinor(v) | UpgradeTarget::Latest(v) | UpgradeTarget::Exact(v, _) => {
                *v
            }
        }
    }

    pub fn is_capped(&self) -> bool {
        matches!(self, UpgradeTarget::NextMinor(_))
    }

    /// Value for `desiredMasterVersion` / `desiredNodeVersion`.
    pub fn desired_version(&self) -> String {
        match self {
            UpgradeTarget::NextMinor(v) => format!("{}.{}", v.major, v.minor),
            UpgradeTarget::Latest(_) => "latest".to_string(),
            UpgradeTarget::Exact(_, raw) => raw.clone(),
        }
    }
}

impl fmt::Display for UpgradeTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpgradeTarget::NextMinor(v) => {
                write!(f, "{}.{} (capped to next minor)", v.major, v.minor)
            }
            UpgradeTarget::Latest(v) => write!(f, "latest ({})", v),
            UpgradeTarget::Exact(_, raw) => write!(f, "{}", raw),
        }
    }
}
