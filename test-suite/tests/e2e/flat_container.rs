use gallery_core::{PackageType, wait::Presence};
use gallery_test_suite::{Requirement, require};
use test_case::test_case;

#[test_case(PackageType::BasePackage)]
#[test_case(PackageType::SemVer1Stable)]
#[test_case(PackageType::SemVer2Prerelease)]
#[test_case(PackageType::SemVer2StableMetadata)]
#[test_case(PackageType::EmbeddedIcon)]
#[test_case(PackageType::Symbols)]
#[tokio::test]
async fn pushed_package_reaches_every_mirror(key: PackageType) {
    let ctx = require!(Requirement::Push, Requirement::FlatContainer);

    let package = ctx.cache.prepare(key).await.unwrap();
    let convergence = ctx
        .flat_container(&package, Presence::Present)
        .await
        .unwrap();

    if let Some(slowest) = convergence.slowest() {
        tracing::info!(%key, target = %slowest.target, elapsed = ?slowest.elapsed, "slowest mirror");
    }
}

#[tokio::test]
async fn unlisted_package_stays_downloadable() {
    let ctx = require!(Requirement::Push, Requirement::Unlist, Requirement::FlatContainer);

    let package = ctx
        .cache
        .prepare(PackageType::SemVer1StableUnlisted)
        .await
        .unwrap();
    ctx.flat_container(&package, Presence::Present)
        .await
        .unwrap();
}
