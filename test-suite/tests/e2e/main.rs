//! Live tests against the configured gallery. One binary so every test shares
//! the push cache of [`gallery_test_suite::GalleryCtx::shared`].

mod flat_container;
mod registration;
mod search;
mod unlist;
