use gallery_registry_client::RegistryClient;
use gallery_registry_core::{Probe, models::SearchResponse};
use url::Url;

use crate::poll::{Convergence, WaitOptions, wait_until};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchExpectation {
    Visible,
    Hidden,
}

/// `{base}/query?q=packageid:{id}&prerelease=true&semVerLevel=2.0.0`
pub fn query_url(
    base: &Url,
    id: &str,
) -> crate::Result<Url> {
    let mut url = gallery_registry_client::endpoint(base, &["query"])?;
    url.query_pairs_mut()
        .append_pair("q", &format!("packageid:{id}"))
        .append_pair("prerelease", "true")
        .append_pair("semVerLevel", "2.0.0");
    Ok(url)
}

pub fn is_complete(
    probe: &Probe<SearchResponse>,
    id: &str,
    version: &str,
    expectation: SearchExpectation,
) -> bool {
    let visible = probe
        .found()
        .is_some_and(|response| response.shows_version(id, version));

    match expectation {
        SearchExpectation::Visible => visible,
        SearchExpectation::Hidden => !visible,
    }
}

/// Waits until every search instance shows (or hides) `version` of `id`.
pub async fn wait_for_search(
    client: &RegistryClient,
    bases: &[Url],
    id: &str,
    version: &str,
    expectation: SearchExpectation,
    options: &WaitOptions,
) -> crate::Result<Convergence> {
    let targets = bases
        .iter()
        .map(|base| query_url(base, id))
        .collect::<crate::Result<Vec<_>>>()?;

    let convergence = wait_until(
        &targets,
        |url: Url| async move { client.fetch::<SearchResponse>(&url).await },
        |probe: &Probe<SearchResponse>| is_complete(probe, id, version, expectation),
        options,
    )
    .await?;

    Ok(convergence)
}
