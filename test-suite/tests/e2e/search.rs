use gallery_core::{PackageType, wait::SearchExpectation};
use gallery_test_suite::{Requirement, require};
use test_case::test_case;

#[test_case(PackageType::BasePackage, SearchExpectation::Visible)]
#[test_case(PackageType::SemVer2Prerelease, SearchExpectation::Visible)]
#[test_case(PackageType::SemVer2StableMetadata, SearchExpectation::Visible)]
#[test_case(PackageType::SemVer1StableUnlisted, SearchExpectation::Hidden)]
#[test_case(PackageType::SemVer2PrereleaseUnlisted, SearchExpectation::Hidden)]
#[tokio::test]
async fn search_shows_listed_packages_only(
    key: PackageType,
    expectation: SearchExpectation,
) {
    let ctx = require!(Requirement::Push, Requirement::Search);
    if expectation == SearchExpectation::Hidden {
        require!(Requirement::Unlist);
    }

    let package = ctx.cache.prepare(key).await.unwrap();
    ctx.search(&package, expectation)
        .await
        .unwrap();
}
