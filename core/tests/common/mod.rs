#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use gallery_core::{
    Error, LocalFuture, NupkgBuilder, Package, PackagePusher, PackageType, PushCache, PushState,
};
use tokio::sync::Notify;

pub const PREFIX: &str = "E2E.";

fn take(counter: &AtomicUsize) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

/// Push side effect that records every call instead of talking to a gallery.
#[derive(Default)]
pub struct RecordingPusher {
    pushes: AtomicUsize,
    unlists: AtomicUsize,
    failing_pushes: AtomicUsize,
    failing_unlists: AtomicUsize,
    delay: Duration,
    blocked: Mutex<HashMap<String, Arc<Notify>>>,
    unlisted: Mutex<Vec<(String, String)>>,
}

impl RecordingPusher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Default::default()
        }
    }

    /// The next `n` pushes fail after being counted.
    pub fn fail_pushes(
        self,
        n: usize,
    ) -> Self {
        self.failing_pushes.store(n, Ordering::SeqCst);
        self
    }

    pub fn fail_unlists(
        self,
        n: usize,
    ) -> Self {
        self.failing_unlists.store(n, Ordering::SeqCst);
        self
    }

    /// Holds pushes of `id` until the returned handle is notified.
    pub fn block(
        &self,
        id: &str,
    ) -> Arc<Notify> {
        let release = Arc::new(Notify::new());
        self.blocked
            .lock()
            .unwrap()
            .insert(id.to_string(), release.clone());
        release
    }

    pub fn unblock(
        &self,
        id: &str,
    ) {
        self.blocked.lock().unwrap().remove(id);
    }

    pub fn pushes(&self) -> usize {
        self.pushes.load(Ordering::SeqCst)
    }

    pub fn unlists(&self) -> usize {
        self.unlists.load(Ordering::SeqCst)
    }

    pub fn unlisted(&self) -> Vec<(String, String)> {
        self.unlisted.lock().unwrap().clone()
    }
}

impl PackagePusher for RecordingPusher {
    fn push<'d>(
        &'d self,
        package: &'d Package,
    ) -> LocalFuture<'d> {
        Box::pin(async move {
            self.pushes.fetch_add(1, Ordering::SeqCst);

            let release = self
                .blocked
                .lock()
                .unwrap()
                .get(&package.id)
                .cloned();
            if let Some(release) = release {
                release.notified().await;
            }

            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }

            if take(&self.failing_pushes) {
                return Err(Error::Io(std::io::Error::other("injected push failure")));
            }
            Ok(())
        })
    }

    fn unlist<'d>(
        &'d self,
        id: &'d str,
        version: &'d str,
    ) -> LocalFuture<'d> {
        Box::pin(async move {
            self.unlists.fetch_add(1, Ordering::SeqCst);

            if take(&self.failing_unlists) {
                return Err(Error::Io(std::io::Error::other("injected unlist failure")));
            }

            self.unlisted
                .lock()
                .unwrap()
                .push((id.to_string(), version.to_string()));
            Ok(())
        })
    }
}

pub fn cache(pusher: Arc<RecordingPusher>) -> Arc<PushCache> {
    gallery_testing::logging();
    Arc::new(PushCache::new(
        Arc::new(NupkgBuilder::default()),
        pusher,
        PREFIX,
    ))
}

/// Polls the cache until `key` reaches `state`, panicking after a second.
pub async fn wait_for_state(
    cache: &PushCache,
    key: PackageType,
    state: PushState,
) {
    for _ in 0..200 {
        if cache.state(key).await == state {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("{key} never reached {state:?}");
}
