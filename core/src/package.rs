use bytes::Bytes;
use gallery_registry_core::PackageVersion;

/// Target framework folder test libraries are placed under.
pub const TARGET_FRAMEWORK: &str = "netstandard2.0";

pub const ICON_FILE: &str = "icon.png";

/// Test package variants. Each variant is pushed at most once per run.
///
/// `Unnamed` carries raw values outside the named set; they behave like
/// [`PackageType::BasePackage`] with an id derived from the number. Build one
/// with [`PackageType::from_raw`] so each raw value maps to exactly one key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PackageType {
    BasePackage,
    SemVer1Stable,
    SemVer1StableUnlisted,
    SemVer2Prerelease,
    SemVer2PrereleaseUnlisted,
    SemVer2StableMetadata,
    SemVer2StableMetadataUnlisted,
    Deprecated,
    EmbeddedIcon,
    Symbols,
    Unnamed(RawKey),
}

/// A raw key value past the named variants. Only [`PackageType::from_raw`]
/// creates one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RawKey(u32);

impl RawKey {
    pub fn value(&self) -> u32 {
        self.0
    }
}

impl PackageType {
    pub const NAMED: [PackageType; 10] = [
        Self::BasePackage,
        Self::SemVer1Stable,
        Self::SemVer1StableUnlisted,
        Self::SemVer2Prerelease,
        Self::SemVer2PrereleaseUnlisted,
        Self::SemVer2StableMetadata,
        Self::SemVer2StableMetadataUnlisted,
        Self::Deprecated,
        Self::EmbeddedIcon,
        Self::Symbols,
    ];

    /// Maps a raw discriminant onto the named variants, keeping anything out of
    /// range as [`PackageType::Unnamed`].
    pub fn from_raw(raw: u32) -> Self {
        Self::NAMED
            .get(raw as usize)
            .copied()
            .unwrap_or(Self::Unnamed(RawKey(raw)))
    }

    pub fn full_version(&self) -> &'static str {
        match self {
            Self::SemVer2Prerelease | Self::SemVer2PrereleaseUnlisted => "1.0.0-alpha.1",
            Self::SemVer2StableMetadata | Self::SemVer2StableMetadataUnlisted => "1.0.0+metadata",
            _ => "1.0.0",
        }
    }

    pub fn is_unlisted(&self) -> bool {
        matches!(
            self,
            Self::SemVer1StableUnlisted
                | Self::SemVer2PrereleaseUnlisted
                | Self::SemVer2StableMetadataUnlisted
        )
    }

    pub fn properties(
        &self,
        id: &str,
    ) -> PackageProperties {
        let mut properties = PackageProperties {
            description: format!("End-to-end test package ({self})."),
            unlist_after_push: self.is_unlisted(),
            ..Default::default()
        };

        match self {
            Self::EmbeddedIcon => properties.icon_file = Some(ICON_FILE.into()),
            Self::Deprecated => {
                properties.deprecation = Some(DeprecationProperties {
                    reasons: vec!["Legacy".into(), "CriticalBugs".into()],
                    message: Some(format!("{id} is deprecated for testing.")),
                    alternate_package_id: None,
                });
            },
            Self::Symbols => {
                properties.symbol_files = vec![format!("lib/{TARGET_FRAMEWORK}/{id}.pdb")];
            },
            _ => {},
        }

        properties
    }
}

impl std::fmt::Display for PackageType {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        match self {
            Self::Unnamed(raw) => write!(f, "{}", raw.value()),
            named => write!(f, "{named:?}"),
        }
    }
}

/// Id of the test package for `key` in a run whose ids start with `prefix`.
pub fn package_id(
    prefix: &str,
    key: PackageType,
) -> String {
    format!("{prefix}{key}")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeprecationProperties {
    pub reasons: Vec<String>,
    pub message: Option<String>,
    pub alternate_package_id: Option<String>,
}

/// Variant-specific metadata carried alongside the package bytes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PackageProperties {
    pub description: String,
    pub icon_file: Option<String>,
    pub deprecation: Option<DeprecationProperties>,
    /// Files whose symbols are indexed for this package.
    pub symbol_files: Vec<String>,
    pub unlist_after_push: bool,
}

/// Everything a [`crate::PackageBuilder`] needs to produce package bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildRequest {
    pub key: PackageType,
    pub id: String,
    pub version: PackageVersion,
    pub properties: PackageProperties,
}

impl BuildRequest {
    pub fn for_key(
        prefix: &str,
        key: PackageType,
    ) -> crate::Result<Self> {
        let id = package_id(prefix, key);
        let version = PackageVersion::parse(key.full_version())?;
        let properties = key.properties(&id);

        Ok(Self {
            key,
            id,
            version,
            properties,
        })
    }
}

/// A built, pushed test package. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Package {
    pub key: PackageType,
    pub id: String,
    pub version: PackageVersion,
    pub content: Bytes,
    pub properties: PackageProperties,
}

impl Package {
    pub fn new(
        request: BuildRequest,
        content: Bytes,
    ) -> Self {
        let BuildRequest {
            key,
            id,
            version,
            properties,
        } = request;

        Self {
            key,
            id,
            version,
            content,
            properties,
        }
    }

    pub fn normalized_version(&self) -> &str {
        self.version.normalized()
    }

    pub fn full_version(&self) -> &str {
        self.version.full()
    }

    pub fn file_name(&self) -> String {
        format!(
            "{}.{}.nupkg",
            self.id.to_lowercase(),
            self.normalized_version().to_lowercase()
        )
    }
}
