#![allow(dead_code)]

use async_trait::async_trait;
use community_feed::models::{
    Identity, NewPost, Post, PostUpdate, Subscription, SubscriptionRemoval, UserProfile, ZipCode,
};
use community_feed::store::{InMemoryStore, PostStore, ProfileStore, SubscriptionStore};
use community_feed::{FeedStore, StoreError, StoreResult};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use uuid::Uuid;

/// In-memory store that counts calls, can fail on demand, and can hold
/// selected operations until released.
#[derive(Default)]
pub struct TestStore {
    pub inner: InMemoryStore,
    pub reads: AtomicUsize,
    pub writes: AtomicUsize,
    pub deletes: AtomicUsize,
    pub fail_reads: AtomicBool,
    pub fail_writes: AtomicBool,
    load_gate: Mutex<Option<(ZipCode, Arc<Notify>)>>,
    insert_gate: Mutex<Option<Arc<Notify>>>,
    delete_gate: Mutex<Option<Arc<Notify>>>,
    removal_gate: Mutex<Option<Arc<Notify>>>,
}

impl TestStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn feed_store(self: &Arc<Self>) -> FeedStore {
        FeedStore::from_backend(self.clone())
    }

    /// Hold loads of `zip` until the returned handle is notified. The snapshot
    /// is taken before waiting, so it predates anything written meanwhile.
    pub fn hold_loads(&self, zip: &ZipCode) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        *self.load_gate.lock() = Some((zip.clone(), notify.clone()));
        notify
    }

    pub fn hold_inserts(&self) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        *self.insert_gate.lock() = Some(notify.clone());
        notify
    }

    pub fn hold_deletes(&self) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        *self.delete_gate.lock() = Some(notify.clone());
        notify
    }

    /// Let the next `remove_zip` apply, then hold its response.
    pub fn hold_removals(&self) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        *self.removal_gate.lock() = Some(notify.clone());
        notify
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn delete_count(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Register a profile and return the matching signed-in identity.
    pub async fn sign_up(&self, display_name: &str) -> Identity {
        let id = Uuid::new_v4();
        self.inner
            .upsert_profile(UserProfile {
                id,
                display_name: display_name.to_string(),
            })
            .await;
        Identity::new(id).with_display_name(display_name)
    }

    fn check_read(&self) -> StoreResult<()> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected read failure".into()));
        }
        Ok(())
    }

    fn check_write(&self) -> StoreResult<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected write failure".into()));
        }
        Ok(())
    }
}

async fn wait_on(gate: Option<Arc<Notify>>) {
    if let Some(notify) = gate {
        notify.notified().await;
    }
}

#[async_trait]
impl PostStore for TestStore {
    async fn insert_post(&self, post: NewPost) -> StoreResult<Post> {
        let gate = self.insert_gate.lock().take();
        wait_on(gate).await;
        self.check_write()?;
        self.inner.insert_post(post).await
    }

    async fn posts_by_zip(&self, zip: &ZipCode) -> StoreResult<Vec<Post>> {
        let gate = {
            let mut slot = self.load_gate.lock();
            let held = matches!(slot.as_ref(), Some((held, _)) if held == zip);
            if held {
                slot.take().map(|(_, n)| n)
            } else {
                None
            }
        };
        let snapshot = match self.check_read() {
            Ok(()) => self.inner.posts_by_zip(zip).await,
            Err(e) => Err(e),
        };
        wait_on(gate).await;
        snapshot
    }

    async fn replace_post(
        &self,
        post_id: Uuid,
        author_id: Uuid,
        update: PostUpdate,
    ) -> StoreResult<Post> {
        self.check_write()?;
        self.inner.replace_post(post_id, author_id, update).await
    }

    async fn delete_post(&self, post_id: Uuid, author_id: Uuid) -> StoreResult<()> {
        let gate = self.delete_gate.lock().take();
        wait_on(gate).await;
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.check_write()?;
        self.inner.delete_post(post_id, author_id).await
    }
}

#[async_trait]
impl ProfileStore for TestStore {
    async fn get_profile(&self, user_id: Uuid) -> StoreResult<Option<UserProfile>> {
        self.check_read()?;
        self.inner.get_profile(user_id).await
    }
}

#[async_trait]
impl SubscriptionStore for TestStore {
    async fn get_subscription(&self, user_id: Uuid) -> StoreResult<Option<Subscription>> {
        self.check_read()?;
        self.inner.get_subscription(user_id).await
    }

    async fn add_zip(&self, user_id: Uuid, zip: &ZipCode) -> StoreResult<Subscription> {
        self.check_write()?;
        self.inner.add_zip(user_id, zip).await
    }

    async fn remove_zip(&self, user_id: Uuid, zip: &ZipCode) -> StoreResult<SubscriptionRemoval> {
        let gate = self.removal_gate.lock().take();
        self.check_write()?;
        let removal = self.inner.remove_zip(user_id, zip).await;
        wait_on(gate).await;
        removal
    }
}

pub fn zip(s: &str) -> ZipCode {
    ZipCode::parse(s).expect("test zip must be valid")
}
