use gallery_registry_client::RegistryClient;
use gallery_registry_core::{Probe, models::FlatContainerIndex};
use url::Url;

use super::{Presence, package_index_urls};
use crate::poll::{Convergence, WaitOptions, wait_until};

pub fn is_complete(
    probe: &Probe<FlatContainerIndex>,
    version: &str,
    presence: Presence,
) -> bool {
    let listed = probe
        .found()
        .is_some_and(|index| index.contains(version));

    match presence {
        Presence::Present => listed,
        Presence::Absent => !listed,
    }
}

/// Waits until every flat container mirror lists (or no longer lists) `version`
/// of `id`.
pub async fn wait_for_flat_container(
    client: &RegistryClient,
    bases: &[Url],
    id: &str,
    version: &str,
    presence: Presence,
    options: &WaitOptions,
) -> crate::Result<Convergence> {
    let targets = package_index_urls(bases, id)?;

    let convergence = wait_until(
        &targets,
        |url: Url| async move { client.fetch::<FlatContainerIndex>(&url).await },
        |probe: &Probe<FlatContainerIndex>| is_complete(probe, version, presence),
        options,
    )
    .await?;

    Ok(convergence)
}
