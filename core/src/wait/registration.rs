use gallery_registry_client::RegistryClient;
use gallery_registry_core::{
    Probe,
    models::{RegistrationIndex, RegistrationPage},
};
use url::Url;

use super::package_index_urls;
use crate::poll::{Convergence, WaitOptions, wait_until};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationExpectation {
    Present,
    /// Gone from every page. Only decided once all pages are inlined.
    Absent,
    Listed(bool),
    Deprecated(bool),
}

/// Fetches the registration index and inlines any page served by reference.
///
/// A referenced page that is not found yet stays un-inlined.
pub async fn fetch_registration(
    client: &RegistryClient,
    url: &Url,
) -> Result<Probe<RegistrationIndex>, gallery_registry_client::Error> {
    let mut index = match client
        .fetch::<RegistrationIndex>(url)
        .await?
    {
        Probe::Found(index) => index,
        Probe::NotFound => return Ok(Probe::NotFound),
    };

    for page in index
        .items
        .iter_mut()
        .filter(|page| !page.is_inlined())
    {
        let page_url = Url::parse(&page.url)?;
        if let Probe::Found(fetched) = client
            .fetch::<RegistrationPage>(&page_url)
            .await?
        {
            tracing::trace!(page = %page_url, "inlined registration page");
            page.items = Some(fetched.items.unwrap_or_default());
        }
    }

    Ok(Probe::Found(index))
}

pub fn is_complete(
    probe: &Probe<RegistrationIndex>,
    version: &str,
    expectation: RegistrationExpectation,
) -> bool {
    let index = match probe {
        Probe::Found(index) => index,
        Probe::NotFound => return expectation == RegistrationExpectation::Absent,
    };

    let leaf = index.leaf(version);

    match expectation {
        RegistrationExpectation::Present => leaf.is_some(),
        RegistrationExpectation::Absent => leaf.is_none() && index.is_fully_inlined(),
        RegistrationExpectation::Listed(listed) => {
            leaf.is_some_and(|leaf| leaf.catalog_entry.listed == listed)
        },
        RegistrationExpectation::Deprecated(deprecated) => {
            leaf.is_some_and(|leaf| leaf.catalog_entry.deprecation.is_some() == deprecated)
        },
    }
}

/// Waits until every registration hive meets `expectation` for `version` of
/// `id`.
pub async fn wait_for_registration(
    client: &RegistryClient,
    bases: &[Url],
    id: &str,
    version: &str,
    expectation: RegistrationExpectation,
    options: &WaitOptions,
) -> crate::Result<Convergence> {
    let targets = package_index_urls(bases, id)?;

    let convergence = wait_until(
        &targets,
        |url: Url| async move { fetch_registration(client, &url).await },
        |probe: &Probe<RegistrationIndex>| is_complete(probe, version, expectation),
        options,
    )
    .await?;

    Ok(convergence)
}
