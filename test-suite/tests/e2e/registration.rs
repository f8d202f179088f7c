use gallery_core::{PackageType, wait::RegistrationExpectation};
use gallery_test_suite::{Requirement, require};
use test_case::test_case;

#[test_case(PackageType::BasePackage, true)]
#[test_case(PackageType::SemVer1Stable, true)]
#[test_case(PackageType::SemVer2Prerelease, true)]
#[test_case(PackageType::SemVer2StableMetadata, true)]
#[test_case(PackageType::SemVer1StableUnlisted, false)]
#[test_case(PackageType::SemVer2PrereleaseUnlisted, false)]
#[test_case(PackageType::SemVer2StableMetadataUnlisted, false)]
#[tokio::test]
async fn registration_reflects_listing(
    key: PackageType,
    listed: bool,
) {
    let ctx = require!(Requirement::Push, Requirement::Registration);
    if !listed {
        require!(Requirement::Unlist);
    }

    let package = ctx.cache.prepare(key).await.unwrap();
    ctx.registration(&package, RegistrationExpectation::Listed(listed))
        .await
        .unwrap();
}

/// The gallery is never asked to deprecate this variant, so only its
/// registration is checked here. Deprecation parsing is covered by the unit
/// tests in `gallery_core::wait::registration`.
#[tokio::test]
async fn deprecated_variant_is_registered() {
    let ctx = require!(Requirement::Push, Requirement::Registration);

    let package = ctx
        .cache
        .prepare(PackageType::Deprecated)
        .await
        .unwrap();
    ctx.registration(&package, RegistrationExpectation::Present)
        .await
        .unwrap();
}

#[tokio::test]
async fn unknown_version_is_absent() {
    let ctx = require!(Requirement::Push, Requirement::Registration);

    let package = ctx
        .cache
        .prepare(PackageType::BasePackage)
        .await
        .unwrap();
    gallery_core::wait::wait_for_registration(
        &ctx.client,
        &ctx.registration,
        &package.id,
        "99.0.0",
        RegistrationExpectation::Absent,
        &ctx.wait_options(),
    )
    .await
    .unwrap();
}
