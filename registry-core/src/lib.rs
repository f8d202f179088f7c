//! Shared types for talking to the gallery read endpoints.
//!
//! The wire models in [`models`] cover the subset of the search, registration
//! and flat-container documents the end-to-end suite inspects. [`Probe`] is the
//! result of fetching one of those documents: a 404 is an expected answer while
//! waiting for a package to appear, so it is data rather than an error.

pub mod models;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum VersionError {
    #[error("invalid version '{version}': {reason}")]
    Invalid { version: String, reason: String },
}

/// Outcome of fetching a document from a read endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Probe<T> {
    Found(T),
    NotFound,
}

impl<T> Probe<T> {
    pub fn found(&self) -> Option<&T> {
        match self {
            Self::Found(value) => Some(value),
            Self::NotFound => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }

    pub fn map<U, F: FnOnce(T) -> U>(
        self,
        f: F,
    ) -> Probe<U> {
        match self {
            Self::Found(value) => Probe::Found(f(value)),
            Self::NotFound => Probe::NotFound,
        }
    }
}

impl<T> From<Option<T>> for Probe<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => Self::Found(value),
            None => Self::NotFound,
        }
    }
}

/// A package version as pushed, plus the form the gallery indexes it under.
///
/// The normalized form drops build metadata; `1.0.0+sha.abc` is served as
/// `1.0.0` by every read endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PackageVersion {
    full: String,
    normalized: String,
}

impl PackageVersion {
    pub fn parse(version: &str) -> Result<Self, VersionError> {
        let parsed = semver::Version::parse(version).map_err(|err| {
            VersionError::Invalid {
                version: version.to_string(),
                reason: err.to_string(),
            }
        })?;

        let normalized = semver::Version {
            build: semver::BuildMetadata::EMPTY,
            ..parsed.clone()
        };

        Ok(Self {
            full: parsed.to_string(),
            normalized: normalized.to_string(),
        })
    }

    pub fn full(&self) -> &str {
        &self.full
    }

    pub fn normalized(&self) -> &str {
        &self.normalized
    }

    pub fn is_semver2(&self) -> bool {
        self.full.contains('+') || self.pre_has_dots()
    }

    fn pre_has_dots(&self) -> bool {
        self.normalized
            .split_once('-')
            .is_some_and(|(_, pre)| pre.contains('.'))
    }
}

impl std::fmt::Display for PackageVersion {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        write!(f, "{}", self.full)
    }
}

/// Compares two versions the way the read endpoints do: case-insensitively and
/// ignoring build metadata.
pub fn versions_match(
    left: &str,
    right: &str,
) -> bool {
    strip_metadata(left).eq_ignore_ascii_case(strip_metadata(right))
}

fn strip_metadata(version: &str) -> &str {
    version
        .split_once('+')
        .map(|(head, _)| head)
        .unwrap_or(version)
}
