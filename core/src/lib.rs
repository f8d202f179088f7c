//! Building blocks for end-to-end tests against a package gallery.
//!
//! - [`poll`] waits until every replica of an eventually consistent endpoint
//!   satisfies a predicate.
//! - [`wait`] composes the poller with the search, registration and
//!   flat-container documents.
//! - [`cache`] pushes each test package variant at most once per run and hands
//!   the same artifact to every test that asks for it.

pub mod builder;
pub mod cache;
mod error;
pub mod package;
pub mod poll;
pub mod push;
pub mod wait;

pub use builder::{NupkgBuilder, PackageBuilder};
pub use cache::{PushCache, PushState};
pub use error::*;
pub use package::{BuildRequest, Package, PackageProperties, PackageType, RawKey};
pub use poll::{Convergence, ConvergenceTimeout, PollError, WaitOptions};
pub use push::{LocalFuture, PackagePusher};
