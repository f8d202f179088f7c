//! Waits on the individual read endpoints.
//!
//! Each helper builds one poll target per configured base url and runs
//! [`crate::poll::wait_until`] with a predicate that only inspects the fetched
//! document.

pub mod flat_container;
pub mod registration;
pub mod search;

pub use flat_container::wait_for_flat_container;
pub use registration::{RegistrationExpectation, wait_for_registration};
pub use search::{SearchExpectation, wait_for_search};
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    Present,
    Absent,
}

/// Document url of `id` under every base, as `{base}/{id-lower}/index.json`.
pub(crate) fn package_index_urls(
    bases: &[Url],
    id: &str,
) -> crate::Result<Vec<Url>> {
    let id = id.to_lowercase();
    bases
        .iter()
        .map(|base| {
            gallery_registry_client::endpoint(base, &[&id, "index.json"]).map_err(crate::Error::from)
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn index_urls_lowercase_the_id() {
        let bases = vec![
            Url::parse("https://a.example/v3-flatcontainer/").unwrap(),
            Url::parse("https://b.example/flat").unwrap(),
        ];

        let urls = package_index_urls(&bases, "E2E.BasePackage").unwrap();
        assert_eq!(
            urls.iter()
                .map(Url::as_str)
                .collect::<Vec<_>>(),
            vec![
                "https://a.example/v3-flatcontainer/e2e.basepackage/index.json",
                "https://b.example/flat/e2e.basepackage/index.json",
            ]
        );
    }
}
