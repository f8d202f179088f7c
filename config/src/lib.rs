use std::path::PathBuf;

use config::{Environment, File};
use serde::de::DeserializeOwned;
use validator::Validate;

mod gallery;
pub mod precondition;

pub use gallery::*;
pub use precondition::{Requirement, Skip};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("validation errors: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("invalid url '{url}': {source}")]
    Url {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("'{origin}': {source}")]
    WithSource {
        origin: String,
        #[source]
        source: Box<Self>,
    },
}

impl Error {
    pub fn with_source(
        self,
        origin: impl Into<String>,
    ) -> Self {
        Self::WithSource {
            origin: origin.into(),
            source: Box::new(self),
        }
    }

    pub fn from_with_source_init<E: Into<Error>>(
        origin: impl Into<String>
    ) -> impl FnOnce(E) -> Self {
        let origin = origin.into();
        move |err| err.into().with_source(origin)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Configuration read from an optional `<dir>/<NAME>` file, overlaid by
/// `<ENV>__*` environment variables (`__` separates nested keys, lists are
/// comma separated).
pub trait NewForConfig
where
    Self: Sized + DeserializeOwned + Validate, {
    const NAME: &'static str;
    const ENV: &'static str;

    /// Keys whose environment values are split into lists.
    const LIST_KEYS: &'static [&'static str] = &[];

    fn environment() -> Environment {
        Self::LIST_KEYS.iter().fold(
            Environment::with_prefix(Self::ENV)
                .prefix_separator("__")
                .separator("__")
                .list_separator(",")
                .try_parsing(true),
            |env, key| env.with_list_parse_key(key),
        )
    }

    fn new<S: AsRef<str>>(dir: Option<S>) -> Result<Self> {
        let file_name = format!(
            "{}",
            PathBuf::from(
                dir.map(|s| String::from(s.as_ref()))
                    .unwrap_or("./".into())
            )
            .join(Self::NAME)
            .display()
        );

        let builder = config::Config::builder()
            .add_source(File::with_name(&file_name).required(false))
            .add_source(Self::environment());

        Self::from_builder(file_name, builder)
    }

    fn from_builder(
        origin: String,
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self> {
        let this: Self = builder
            .build()
            .map_err(Error::from_with_source_init(origin.clone()))?
            .try_deserialize()
            .map_err(Error::from_with_source_init(origin.clone()))?;

        this.validate()
            .map_err(Error::from_with_source_init(origin.clone()))?;

        tracing::debug!("loaded {} configuration from '{}'", Self::NAME, origin);

        Ok(this)
    }
}
