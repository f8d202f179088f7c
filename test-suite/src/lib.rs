//! Shared context for the live end-to-end tests.
//!
//! The suite runs against the gallery described by [`GalleryConfig`]. Nothing
//! here is global except [`GalleryCtx::shared`], which builds one context per
//! test binary so every test reuses the same push cache.

use std::sync::{Arc, OnceLock};

use chrono::{DateTime, Utc};
pub use gallery_config::{GalleryConfig, NewForConfig, Requirement, Skip};
use gallery_core::{
    Convergence, NupkgBuilder, Package, PushCache, WaitOptions,
    wait::{
        Presence, RegistrationExpectation, SearchExpectation, wait_for_flat_container,
        wait_for_registration, wait_for_search,
    },
};
use gallery_registry_client::{ClientOptions, RegistryClient, RetryPolicy};
pub use tracing;
use url::Url;

/// Directory searched for `gallery.toml` when set.
pub const CONFIG_DIR_ENV: &str = "GALLERY_CONFIG_DIR";

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] gallery_config::Error),

    #[error(transparent)]
    Client(#[from] gallery_registry_client::Error),
}

/// Id prefix for one run. Every run pushes fresh ids so reruns never collide
/// with packages left behind by earlier runs.
pub fn run_prefix(
    prefix: &str,
    now: DateTime<Utc>,
) -> String {
    format!("{prefix}{}.", now.format("%Y%m%d%H%M%S%3f"))
}

pub struct GalleryCtx {
    pub config: GalleryConfig,
    pub client: Arc<RegistryClient>,
    pub cache: PushCache,
    pub search: Vec<Url>,
    pub registration: Vec<Url>,
    pub flat_container: Vec<Url>,
}

impl GalleryCtx {
    pub fn new(config: GalleryConfig) -> Result<Self, Error> {
        let polling = &config.polling;
        let client = Arc::new(RegistryClient::new(
            &config.gallery_url,
            config.api_key.clone(),
            ClientOptions {
                request_timeout: polling.request_timeout(),
                retry: RetryPolicy {
                    attempts: polling.probe_attempts,
                    delay: polling.probe_retry_delay(),
                },
                // each test runs on its own runtime
                reuse_connections: false,
            },
        )?);

        let prefix = run_prefix(&config.packages.id_prefix, Utc::now());
        tracing::info!(gallery = %config.gallery_url, %prefix, "using gallery");

        let cache = PushCache::new(Arc::new(NupkgBuilder::default()), client.clone(), prefix);

        Ok(Self {
            search: config.search.urls()?,
            registration: config.registration.urls()?,
            flat_container: config.flat_container.urls()?,
            client,
            cache,
            config,
        })
    }

    /// The context for this test binary, or `None` when no gallery is
    /// configured.
    pub fn shared() -> Option<&'static Self> {
        static CTX: OnceLock<Option<GalleryCtx>> = OnceLock::new();

        CTX.get_or_init(|| {
            dotenvy::dotenv().ok();
            gallery_testing::logging();

            let dir = std::env::var(CONFIG_DIR_ENV).ok();
            let loaded = GalleryConfig::new(dir)
                .map_err(Error::from)
                .and_then(Self::new);

            match loaded {
                Ok(ctx) => Some(ctx),
                Err(err) => {
                    tracing::warn!("no usable gallery configuration: {}", err);
                    None
                },
            }
        })
        .as_ref()
    }

    pub fn check(
        &self,
        requirements: &[Requirement],
    ) -> Result<(), Skip> {
        self.config.check(requirements)
    }

    pub fn wait_options(&self) -> WaitOptions {
        WaitOptions::new(
            self.config.polling.max_wait(),
            self.config.polling.sleep_interval(),
        )
    }

    pub async fn flat_container(
        &self,
        package: &Package,
        presence: Presence,
    ) -> gallery_core::Result<Convergence> {
        wait_for_flat_container(
            &self.client,
            &self.flat_container,
            &package.id,
            package.normalized_version(),
            presence,
            &self.wait_options(),
        )
        .await
    }

    pub async fn registration(
        &self,
        package: &Package,
        expectation: RegistrationExpectation,
    ) -> gallery_core::Result<Convergence> {
        wait_for_registration(
            &self.client,
            &self.registration,
            &package.id,
            package.normalized_version(),
            expectation,
            &self.wait_options(),
        )
        .await
    }

    pub async fn search(
        &self,
        package: &Package,
        expectation: SearchExpectation,
    ) -> gallery_core::Result<Convergence> {
        wait_for_search(
            &self.client,
            &self.search,
            &package.id,
            package.normalized_version(),
            expectation,
            &self.wait_options(),
        )
        .await
    }
}

/// Returns the shared [`GalleryCtx`] if every requirement holds, otherwise logs
/// why and returns from the calling test.
#[macro_export]
macro_rules! require {
    ($($requirement:expr),* $(,)?) => {
        match $crate::GalleryCtx::shared() {
            Some(ctx) => match ctx.check(&[$($requirement),*]) {
                Ok(()) => ctx,
                Err(skip) => {
                    $crate::tracing::warn!("{}", skip);
                    return;
                },
            },
            None => {
                $crate::tracing::warn!("skipped: no gallery configured");
                return;
            },
        }
    };
}
