//! Decides up front whether a test group can run against the configured
//! gallery. Tests call [`GalleryConfig::check`] first and return early with a
//! logged [`Skip`] when a requirement is not met.

use crate::GalleryConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    /// Packages can be pushed.
    Push,
    /// Pushed packages can be unlisted and relisted.
    Unlist,
    Search,
    Registration,
    FlatContainer,
    /// The gallery accepts writes at all.
    Writable,
}

impl std::fmt::Display for Requirement {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        let name = match self {
            Self::Push => "push",
            Self::Unlist => "unlist",
            Self::Search => "search",
            Self::Registration => "registration",
            Self::FlatContainer => "flat-container",
            Self::Writable => "writable",
        };
        write!(f, "{name}")
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("skipped ({requirement}): {reason}")]
pub struct Skip {
    pub requirement: Requirement,
    pub reason: String,
}

impl Skip {
    fn new(
        requirement: Requirement,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            requirement,
            reason: reason.into(),
        }
    }
}

impl GalleryConfig {
    fn check_one(
        &self,
        requirement: Requirement,
    ) -> Result<(), Skip> {
        let features = &self.features;
        let writable = || {
            if features.read_only {
                Err(Skip::new(requirement, "gallery is read-only"))
            } else {
                Ok(())
            }
        };
        let keyed = || {
            if self.api_key.is_none() {
                Err(Skip::new(requirement, "no api key configured"))
            } else {
                Ok(())
            }
        };
        let replicas = |urls: &[String]| {
            if urls.is_empty() {
                Err(Skip::new(requirement, "no base urls configured"))
            } else {
                Ok(())
            }
        };
        let enabled = |flag: bool| {
            if flag {
                Ok(())
            } else {
                Err(Skip::new(requirement, "disabled by feature flag"))
            }
        };

        match requirement {
            Requirement::Writable => writable(),
            Requirement::Push => {
                enabled(features.push_enabled)?;
                writable()?;
                keyed()
            },
            Requirement::Unlist => {
                enabled(features.unlist_enabled)?;
                writable()?;
                keyed()
            },
            Requirement::Search => {
                enabled(features.search_enabled)?;
                replicas(&self.search.base_urls)
            },
            Requirement::Registration => {
                enabled(features.registration_enabled)?;
                replicas(&self.registration.base_urls)
            },
            Requirement::FlatContainer => {
                enabled(features.flat_container_enabled)?;
                replicas(&self.flat_container.base_urls)
            },
        }
    }

    /// Checks every requirement, reporting the first one that is not met.
    pub fn check(
        &self,
        requirements: &[Requirement],
    ) -> Result<(), Skip> {
        requirements
            .iter()
            .try_for_each(|requirement| self.check_one(*requirement))
    }
}

#[cfg(test)]
mod test {
    use test_case::test_case;

    use super::*;
    use crate::{EndpointConfig, FeatureFlags};

    fn config() -> GalleryConfig {
        GalleryConfig {
            gallery_url: "https://gallery.example.test/".into(),
            api_key: Some("key".into()),
            search: EndpointConfig {
                base_urls: vec!["https://search.example.test/".into()],
            },
            registration: EndpointConfig {
                base_urls: vec!["https://reg.example.test/".into()],
            },
            flat_container: EndpointConfig::default(),
            polling: Default::default(),
            packages: Default::default(),
            features: FeatureFlags::default(),
        }
    }

    #[test]
    fn fully_configured_requirements_pass() {
        let config = config();
        assert_eq!(
            config.check(&[
                Requirement::Push,
                Requirement::Unlist,
                Requirement::Search,
                Requirement::Registration,
            ]),
            Ok(())
        );
    }

    #[test]
    fn empty_replica_list_skips() {
        let skip = config()
            .check(&[Requirement::Search, Requirement::FlatContainer])
            .unwrap_err();
        assert_eq!(skip.requirement, Requirement::FlatContainer);
        assert_eq!(
            skip.to_string(),
            "skipped (flat-container): no base urls configured"
        );
    }

    #[test_case(Requirement::Push; "push")]
    #[test_case(Requirement::Unlist; "unlist")]
    #[test_case(Requirement::Writable; "writable")]
    fn read_only_gallery_skips_writes(requirement: Requirement) {
        let mut config = config();
        config.features.read_only = true;

        let skip = config.check(&[requirement]).unwrap_err();
        assert_eq!(skip.reason, "gallery is read-only");
    }

    #[test]
    fn push_needs_an_api_key() {
        let mut config = config();
        config.api_key = None;

        let skip = config.check(&[Requirement::Push]).unwrap_err();
        assert_eq!(skip.reason, "no api key configured");
    }

    #[test]
    fn disabled_group_skips_before_anything_else() {
        let mut config = config();
        config.features.search_enabled = false;

        let skip = config.check(&[Requirement::Search]).unwrap_err();
        assert_eq!(skip.reason, "disabled by feature flag");
    }
}
