use serde::{Deserialize, Serialize};

use crate::versions_match;

/// Response of the search `query` endpoint.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    #[serde(default)]
    pub total_hits: u64,
    #[serde(default)]
    pub data: Vec<SearchResult>,
}

/// One package in a search response. `version` is the latest visible version.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub id: String,
    pub version: String,
    #[serde(default)]
    pub versions: Vec<SearchVersion>,
    #[serde(default)]
    pub deprecation: Option<Deprecation>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SearchVersion {
    pub version: String,
    #[serde(default)]
    pub downloads: u64,
}

impl SearchResponse {
    pub fn find(
        &self,
        id: &str,
    ) -> Option<&SearchResult> {
        self.data
            .iter()
            .find(|result| result.id.eq_ignore_ascii_case(id))
    }

    /// Whether `version` of `id` is shown, either as the latest version or in
    /// the version list.
    pub fn shows_version(
        &self,
        id: &str,
        version: &str,
    ) -> bool {
        self.find(id).is_some_and(|result| {
            versions_match(&result.version, version)
                || result
                    .versions
                    .iter()
                    .any(|v| versions_match(&v.version, version))
        })
    }
}

/// Registration index for one package id.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationIndex {
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub items: Vec<RegistrationPage>,
}

/// A page of registration leaves. Large packages serve pages by reference only,
/// in which case `items` is absent and the page must be fetched from `url`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationPage {
    #[serde(rename = "@id")]
    pub url: String,
    #[serde(default)]
    pub count: u64,
    pub lower: String,
    pub upper: String,
    #[serde(default)]
    pub items: Option<Vec<RegistrationLeaf>>,
}

impl RegistrationPage {
    pub fn is_inlined(&self) -> bool {
        self.items.is_some()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationLeaf {
    pub catalog_entry: CatalogEntry,
    #[serde(default)]
    pub package_content: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    pub id: String,
    pub version: String,
    #[serde(default = "default_listed")]
    pub listed: bool,
    #[serde(default)]
    pub deprecation: Option<Deprecation>,
}

fn default_listed() -> bool {
    true
}

impl RegistrationIndex {
    /// Leaves of every inlined page. Pages served by reference contribute
    /// nothing until they have been fetched and inlined.
    pub fn leaves(&self) -> impl Iterator<Item = &RegistrationLeaf> {
        self.items
            .iter()
            .filter_map(|page| page.items.as_ref())
            .flatten()
    }

    pub fn leaf(
        &self,
        version: &str,
    ) -> Option<&RegistrationLeaf> {
        self.leaves()
            .find(|leaf| versions_match(&leaf.catalog_entry.version, version))
    }

    pub fn is_fully_inlined(&self) -> bool {
        self.items.iter().all(RegistrationPage::is_inlined)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Deprecation {
    #[serde(default)]
    pub reasons: Vec<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub alternate_package: Option<AlternatePackage>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AlternatePackage {
    pub id: String,
    #[serde(default)]
    pub range: Option<String>,
}

/// Version list served by the flat container for one package id.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct FlatContainerIndex {
    #[serde(default)]
    pub versions: Vec<String>,
}

impl FlatContainerIndex {
    pub fn contains(
        &self,
        version: &str,
    ) -> bool {
        self.versions
            .iter()
            .any(|v| versions_match(v, version))
    }
}
