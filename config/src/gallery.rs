use std::time::Duration;

use secrecy::SecretString;
use serde::Deserialize;
use validator::{Validate, ValidationError};

use crate::{Error, NewForConfig};

fn default_max_wait_ms() -> u64 {
    10 * 60 * 1000
}

fn default_sleep_interval_ms() -> u64 {
    5_000
}

fn default_probe_attempts() -> u32 {
    3
}

fn default_probe_retry_delay_ms() -> u64 {
    1_000
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

fn default_id_prefix() -> String {
    "E2E.".into()
}

fn default_true() -> bool {
    true
}

fn validate_urls(urls: &[String]) -> Result<(), ValidationError> {
    for url in urls {
        if url::Url::parse(url).is_err() {
            return Err(ValidationError::new("url")
                .with_message(format!("'{url}' is not a valid url").into()));
        }
    }
    Ok(())
}

/// Root configuration for a run of the end-to-end suite.
#[derive(Deserialize, Debug, Validate)]
pub struct GalleryConfig {
    /// Gallery the packages are pushed to.
    #[validate(url)]
    pub gallery_url: String,

    #[serde(default)]
    pub api_key: Option<SecretString>,

    #[validate(nested)]
    #[serde(default)]
    pub search: EndpointConfig,

    #[validate(nested)]
    #[serde(default)]
    pub registration: EndpointConfig,

    #[validate(nested)]
    #[serde(default)]
    pub flat_container: EndpointConfig,

    #[validate(nested)]
    #[serde(default)]
    pub polling: PollingConfig,

    #[validate(nested)]
    #[serde(default)]
    pub packages: PackagesConfig,

    #[serde(default)]
    pub features: FeatureFlags,
}

impl NewForConfig for GalleryConfig {
    const NAME: &'static str = "gallery";
    const ENV: &'static str = "GALLERY";
    const LIST_KEYS: &'static [&'static str] = &[
        "search.base_urls",
        "registration.base_urls",
        "flat_container.base_urls",
    ];
}

/// Read replicas of one endpoint family. Every replica must converge before a
/// wait succeeds.
#[derive(Deserialize, Debug, Default, Clone, Validate)]
pub struct EndpointConfig {
    #[validate(custom(function = "validate_urls"))]
    #[serde(default)]
    pub base_urls: Vec<String>,
}

impl EndpointConfig {
    pub fn urls(&self) -> crate::Result<Vec<url::Url>> {
        self.base_urls
            .iter()
            .map(|url| {
                url::Url::parse(url).map_err(|source| {
                    Error::Url {
                        url: url.clone(),
                        source,
                    }
                })
            })
            .collect()
    }
}

#[derive(Deserialize, Debug, Clone, Validate)]
pub struct PollingConfig {
    #[validate(range(min = 1))]
    #[serde(default = "default_max_wait_ms")]
    pub max_wait_ms: u64,

    #[validate(range(min = 1))]
    #[serde(default = "default_sleep_interval_ms")]
    pub sleep_interval_ms: u64,

    #[validate(range(min = 1, max = 10))]
    #[serde(default = "default_probe_attempts")]
    pub probe_attempts: u32,

    #[serde(default = "default_probe_retry_delay_ms")]
    pub probe_retry_delay_ms: u64,

    #[validate(range(min = 1))]
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            max_wait_ms: default_max_wait_ms(),
            sleep_interval_ms: default_sleep_interval_ms(),
            probe_attempts: default_probe_attempts(),
            probe_retry_delay_ms: default_probe_retry_delay_ms(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl PollingConfig {
    pub fn max_wait(&self) -> Duration {
        Duration::from_millis(self.max_wait_ms)
    }

    pub fn sleep_interval(&self) -> Duration {
        Duration::from_millis(self.sleep_interval_ms)
    }

    pub fn probe_retry_delay(&self) -> Duration {
        Duration::from_millis(self.probe_retry_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

#[derive(Deserialize, Debug, Clone, Validate)]
pub struct PackagesConfig {
    /// Prepended to every test package id.
    #[validate(length(min = 1, max = 64))]
    #[serde(default = "default_id_prefix")]
    pub id_prefix: String,
}

impl Default for PackagesConfig {
    fn default() -> Self {
        Self {
            id_prefix: default_id_prefix(),
        }
    }
}

/// Switches for test groups. A disabled group is skipped, never failed.
#[derive(Deserialize, Debug, Clone)]
pub struct FeatureFlags {
    #[serde(default = "default_true")]
    pub push_enabled: bool,
    #[serde(default = "default_true")]
    pub unlist_enabled: bool,
    #[serde(default = "default_true")]
    pub search_enabled: bool,
    #[serde(default = "default_true")]
    pub registration_enabled: bool,
    #[serde(default = "default_true")]
    pub flat_container_enabled: bool,
    /// The target gallery must not be written to.
    #[serde(default)]
    pub read_only: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            push_enabled: true,
            unlist_enabled: true,
            search_enabled: true,
            registration_enabled: true,
            flat_container_enabled: true,
            read_only: false,
        }
    }
}
