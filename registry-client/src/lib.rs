#![allow(clippy::result_large_err)]

use std::time::Duration;

use gallery_registry_core::Probe;
use secrecy::ExposeSecret;

/// Header the gallery reads the push api key from.
pub const API_KEY_HEADER: &str = "X-NuGet-ApiKey";

const PACKAGE_PATH: [&str; 3] = ["api", "v2", "package"];

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("No api key provided (set GALLERY__API_KEY environment variable)")]
    NoAuth,
    #[error("Reqwest error: {0}")]
    Reqwest(#[from] reqwest::Error),
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),
    #[error("'{0}' cannot be used as a base url")]
    CannotBeBase(String),
    #[error("Serde error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("API Error: {0}")]
    Response(#[from] ResponseError),
    #[error("'{url}' still failing after {attempts} attempts: {source}")]
    RetriesExhausted {
        url: String,
        attempts: u32,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Failures worth another attempt: the network, gateway errors and
    /// throttling. Everything else is an answer.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Reqwest(err) => err.is_connect() || err.is_timeout() || err.is_request(),
            Self::Response(err) => {
                err.status.is_server_error()
                    || err.status == reqwest::StatusCode::TOO_MANY_REQUESTS
            },
            _ => false,
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub struct ResponseError {
    pub status: reqwest::StatusCode,
    pub body: String,
}

impl std::fmt::Display for ResponseError {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        if self.body.is_empty() {
            write!(f, "{}: empty response body", self.status.as_u16())
        } else {
            write!(f, "{}: {}", self.status.as_u16(), self.body)
        }
    }
}

impl ResponseError {
    fn new(
        status: reqwest::StatusCode,
        body: bytes::Bytes,
    ) -> Self {
        Self {
            status,
            body: String::from_utf8_lossy(&body).into_owned(),
        }
    }
}

/// How many times a read probe is attempted before a transient failure is
/// surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub request_timeout: Duration,
    pub retry: RetryPolicy,
    /// Keep idle connections around between requests. Disable when one client
    /// is shared by tests that each run on their own runtime.
    pub reuse_connections: bool,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
            reuse_connections: true,
        }
    }
}

/// Appends `segments` to the path of `base`, treating `base` as a directory.
pub fn endpoint(
    base: &url::Url,
    segments: &[&str],
) -> Result<url::Url, Error> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| Error::CannotBeBase(base.to_string()))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

pub struct RegistryClient {
    client: reqwest::Client,
    gallery_url: url::Url,
    api_key: Option<secrecy::SecretString>,
    retry: RetryPolicy,
}

impl RegistryClient {
    pub fn new(
        gallery_url: &str,
        api_key: Option<secrecy::SecretString>,
        options: ClientOptions,
    ) -> Result<Self, Error> {
        let gallery_url = url::Url::parse(gallery_url)?;

        let mut builder = reqwest::Client::builder().timeout(options.request_timeout);
        if !options.reuse_connections {
            builder = builder.pool_max_idle_per_host(0);
        }

        Ok(Self {
            client: builder.build()?,
            gallery_url,
            api_key,
            retry: options.retry,
        })
    }

    pub fn gallery_url(&self) -> &url::Url {
        &self.gallery_url
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    fn package_url(
        &self,
        id: &str,
        version: &str,
    ) -> Result<url::Url, Error> {
        let mut segments = PACKAGE_PATH.to_vec();
        segments.extend([id, version]);
        endpoint(&self.gallery_url, &segments)
    }

    /// Fetches and deserializes a read-endpoint document.
    ///
    /// A 404 is returned as [`Probe::NotFound`]. Transient failures are retried
    /// according to the client's [`RetryPolicy`].
    pub async fn fetch<T: serde::de::DeserializeOwned>(
        &self,
        url: &url::Url,
    ) -> Result<Probe<T>, Error> {
        let attempts = self.retry.attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;

            let err = match self.fetch_once(url).await {
                Ok(probe) => return Ok(probe),
                Err(err) => err,
            };

            if !err.is_transient() {
                return Err(err);
            }

            if attempt >= attempts {
                return Err(Error::RetriesExhausted {
                    url: url.to_string(),
                    attempts: attempt,
                    source: Box::new(err),
                });
            }

            tracing::warn!(%url, attempt, "transient probe failure: {}", err);
            tokio::time::sleep(self.retry.delay).await;
        }
    }

    async fn fetch_once<T: serde::de::DeserializeOwned>(
        &self,
        url: &url::Url,
    ) -> Result<Probe<T>, Error> {
        let resp = self.client.get(url.clone()).send().await?;

        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            tracing::trace!(%url, "not found");
            return Ok(Probe::NotFound);
        }

        let body = resp.bytes().await?;

        if status.is_success() {
            Ok(Probe::Found(serde_json::from_slice(&body)?))
        } else {
            Err(ResponseError::new(status, body).into())
        }
    }

    async fn perform_authenticated(
        &self,
        req: reqwest::RequestBuilder,
    ) -> Result<reqwest::StatusCode, Error> {
        let Some(api_key) = &self.api_key else {
            return Err(Error::NoAuth);
        };

        let resp = req
            .header(API_KEY_HEADER, api_key.expose_secret())
            .send()
            .await?;

        let status = resp.status();
        if status.is_success() {
            Ok(status)
        } else {
            let body = resp.bytes().await?;
            Err(ResponseError::new(status, body).into())
        }
    }

    /// Uploads a built package. Pushes are never retried.
    pub async fn push(
        &self,
        file_name: &str,
        package: bytes::Bytes,
    ) -> Result<(), Error> {
        let url = endpoint(&self.gallery_url, &PACKAGE_PATH)?;

        let part = reqwest::multipart::Part::stream(package)
            .file_name(file_name.to_string())
            .mime_str("application/octet-stream")?;
        let form = reqwest::multipart::Form::new().part("package", part);

        let status = self
            .perform_authenticated(self.client.put(url).multipart(form))
            .await?;

        tracing::info!(file_name, status = status.as_u16(), "pushed package");
        Ok(())
    }

    pub async fn unlist(
        &self,
        id: &str,
        version: &str,
    ) -> Result<(), Error> {
        let url = self.package_url(id, version)?;
        self.perform_authenticated(self.client.delete(url)).await?;

        tracing::info!("Unlisted {}@{}", id, version);
        Ok(())
    }

    pub async fn relist(
        &self,
        id: &str,
        version: &str,
    ) -> Result<(), Error> {
        let url = self.package_url(id, version)?;
        self.perform_authenticated(self.client.post(url)).await?;

        tracing::info!("Relisted {}@{}", id, version);
        Ok(())
    }
}
