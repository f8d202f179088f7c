use gallery_core::{
    PackageType,
    wait::{RegistrationExpectation, SearchExpectation},
};
use gallery_test_suite::{Requirement, require};

/// Raw key reserved for this test so no other test sees its listing change.
const UNLIST_RELIST_KEY: u32 = 100;

#[tokio::test]
async fn unlist_then_relist() {
    let ctx = require!(
        Requirement::Push,
        Requirement::Unlist,
        Requirement::Registration,
        Requirement::Search,
    );

    let package = ctx
        .cache
        .prepare(PackageType::from_raw(UNLIST_RELIST_KEY))
        .await
        .unwrap();
    let version = package.normalized_version();

    ctx.registration(&package, RegistrationExpectation::Listed(true))
        .await
        .unwrap();
    ctx.search(&package, SearchExpectation::Visible)
        .await
        .unwrap();

    ctx.client.unlist(&package.id, version).await.unwrap();
    ctx.registration(&package, RegistrationExpectation::Listed(false))
        .await
        .unwrap();
    ctx.search(&package, SearchExpectation::Hidden)
        .await
        .unwrap();

    ctx.client.relist(&package.id, version).await.unwrap();
    ctx.registration(&package, RegistrationExpectation::Listed(true))
        .await
        .unwrap();
    ctx.search(&package, SearchExpectation::Visible)
        .await
        .unwrap();
}
