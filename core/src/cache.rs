//! Deduplicating push cache.
//!
//! Every [`PackageType`] is built and pushed at most once for the lifetime of
//! a [`PushCache`]. Concurrent callers for the same key queue on that key's
//! gate; callers for different keys never touch each other's gates.

use std::{
    collections::BTreeMap,
    sync::{
        Arc, OnceLock,
        atomic::{AtomicU64, Ordering},
    },
};

use tokio::sync::OwnedMutexGuard;
use tracing::Instrument;

use crate::{
    Error,
    builder::PackageBuilder,
    package::{BuildRequest, Package, PackageType, package_id},
    push::PackagePusher,
};

/// Observable lifecycle of one key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushState {
    Unregistered,
    Registered,
    Pushing,
    Pushed,
}

#[derive(Default)]
struct Gate {
    /// Pushed, but the follow-up unlist has not succeeded yet.
    landed: Option<Arc<Package>>,
    last_failure: Option<Arc<Error>>,
}

#[derive(Default)]
struct CachedPush {
    package: OnceLock<Arc<Package>>,
    gate: Arc<tokio::sync::Mutex<Gate>>,
    failures: AtomicU64,
}

pub struct PushCache {
    entries: tokio::sync::Mutex<BTreeMap<PackageType, Arc<CachedPush>>>,
    builder: Arc<dyn PackageBuilder>,
    pusher: Arc<dyn PackagePusher>,
    id_prefix: String,
}

impl std::fmt::Debug for PushCache {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("PushCache")
            .field("id_prefix", &self.id_prefix)
            .finish_non_exhaustive()
    }
}

impl PushCache {
    pub fn new(
        builder: Arc<dyn PackageBuilder>,
        pusher: Arc<dyn PackagePusher>,
        id_prefix: impl Into<String>,
    ) -> Self {
        Self {
            entries: Default::default(),
            builder,
            pusher,
            id_prefix: id_prefix.into(),
        }
    }

    pub fn id_prefix(&self) -> &str {
        &self.id_prefix
    }

    pub fn id_for(
        &self,
        key: PackageType,
    ) -> String {
        package_id(&self.id_prefix, key)
    }

    async fn entry(
        &self,
        key: PackageType,
    ) -> Arc<CachedPush> {
        let mut entries = self.entries.lock().await;
        entries
            .entry(key)
            .or_insert_with(|| {
                tracing::trace!(%key, "registered");
                Default::default()
            })
            .clone()
    }

    pub async fn state(
        &self,
        key: PackageType,
    ) -> PushState {
        let entry = match self.entries.lock().await.get(&key) {
            Some(entry) => entry.clone(),
            None => return PushState::Unregistered,
        };

        if entry.package.get().is_some() {
            PushState::Pushed
        } else if entry.gate.try_lock().is_err() {
            PushState::Pushing
        } else {
            PushState::Registered
        }
    }

    /// Returns the package for `key`, building and pushing it first if no
    /// caller has done so yet.
    ///
    /// If the push fails, the caller that ran it gets [`Error::Push`] and any
    /// caller queued behind it gets [`Error::InFlightPushFailed`]. The key stays
    /// retryable: the next call attempts the push again.
    pub async fn prepare(
        &self,
        key: PackageType,
    ) -> crate::Result<Arc<Package>> {
        let span = tracing::info_span!("prepare", %key);
        self.prepare_inner(key).instrument(span).await
    }

    async fn prepare_inner(
        &self,
        key: PackageType,
    ) -> crate::Result<Arc<Package>> {
        let entry = self.entry(key).await;

        if let Some(package) = entry.package.get() {
            tracing::trace!("cache hit");
            return Ok(package.clone());
        }

        let seen_failures = entry.failures.load(Ordering::Acquire);

        let gate = match entry.gate.clone().try_lock_owned() {
            Ok(gate) => gate,
            Err(_) => {
                tracing::debug!("waiting on in-flight push");
                entry.gate.clone().lock_owned().await
            },
        };

        if let Some(package) = entry.package.get() {
            tracing::trace!("pushed while waiting");
            return Ok(package.clone());
        }

        if entry.failures.load(Ordering::Acquire) != seen_failures {
            if let Some(source) = &gate.last_failure {
                return Err(Error::InFlightPushFailed {
                    key: key.to_string(),
                    source: source.clone(),
                });
            }
        }

        tracing::trace!("cache miss");
        // the task owns the gate and runs to completion even if this caller is dropped
        let job = PushJob {
            builder: self.builder.clone(),
            pusher: self.pusher.clone(),
            id_prefix: self.id_prefix.clone(),
        };
        let task = tokio::spawn(
            job.run(key, entry.clone(), gate)
                .instrument(tracing::Span::current()),
        );

        match task.await? {
            Ok(package) => Ok(package),
            Err(err) => Err(Error::with_key(key)(err)),
        }
    }
}

struct PushJob {
    builder: Arc<dyn PackageBuilder>,
    pusher: Arc<dyn PackagePusher>,
    id_prefix: String,
}

impl PushJob {
    /// Pushes `key` and records the outcome in `entry` before the gate is
    /// released.
    async fn run(
        self,
        key: PackageType,
        entry: Arc<CachedPush>,
        mut gate: OwnedMutexGuard<Gate>,
    ) -> std::result::Result<Arc<Package>, Arc<Error>> {
        match self.push_new(key, &mut gate).await {
            Ok(package) => {
                gate.landed = None;
                gate.last_failure = None;
                Ok(entry.package.get_or_init(|| package).clone())
            },
            Err(err) => {
                let err = Arc::new(err);
                gate.last_failure = Some(err.clone());
                entry.failures.fetch_add(1, Ordering::AcqRel);
                Err(err)
            },
        }
    }

    async fn push_new(
        &self,
        key: PackageType,
        gate: &mut Gate,
    ) -> crate::Result<Arc<Package>> {
        let package = match gate.landed.clone() {
            Some(package) => {
                tracing::debug!("already pushed, retrying unlist");
                package
            },
            None => {
                let request = BuildRequest::for_key(&self.id_prefix, key)?;
                let content = self.builder.build(&request)?;
                let package = Arc::new(Package::new(request, content));

                self.pusher.push(&package).await?;
                tracing::info!(id = %package.id, version = %package.version, "pushed");
                package
            },
        };

        if package.properties.unlist_after_push {
            gate.landed = Some(package.clone());
            self.pusher
                .unlist(&package.id, package.normalized_version())
                .await
                .map_err(|source| {
                    Error::Unlist {
                        id: package.id.clone(),
                        version: package.normalized_version().to_string(),
                        source: Box::new(source),
                    }
                })?;
            tracing::info!(id = %package.id, version = %package.version, "unlisted");
        }

        Ok(package)
    }
}
