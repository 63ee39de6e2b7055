use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::error::{FeedError, FeedResult};
use crate::models::{Subscription, SubscriptionRemoval, ZipCode};
use crate::store::{FeedStore, SubscriptionStore};

/// Last known state of one user's record. `record` is `None` after the store
/// deleted it; the version is kept so older responses stay rejected.
#[derive(Debug, Clone)]
struct CachedSubscription {
    version: i64,
    record: Option<Subscription>,
}

/// Per-user zip subscriptions with a local cache of the stored records.
///
/// Set changes go through the store's atomic add/remove, and the cache only
/// accepts results newer than the one it holds.
pub struct SubscriptionManager {
    store: Arc<dyn SubscriptionStore>,
    cache: RwLock<HashMap<Uuid, CachedSubscription>>,
    notice: Mutex<Option<String>>,
}

impl SubscriptionManager {
    pub fn new(store: Arc<dyn SubscriptionStore>) -> Self {
        Self {
            store,
            cache: RwLock::new(HashMap::new()),
            notice: Mutex::new(None),
        }
    }

    pub fn from_store(store: &FeedStore) -> Self {
        Self::new(store.subscriptions.clone())
    }

    /// Reload the user's record from the store.
    ///
    /// A failed read is logged and presented as "no subscriptions".
    pub async fn refresh(&self, user_id: Uuid) -> FeedResult<Vec<ZipCode>> {
        match self.store.get_subscription(user_id).await {
            Ok(Some(record)) => {
                self.apply(user_id, record.version, Some(record));
            }
            Ok(None) => {
                self.cache.write().remove(&user_id);
            }
            Err(e) => {
                error!(%user_id, error = %e, "failed to load subscriptions");
                self.cache.write().remove(&user_id);
                return Err(self.surface(FeedError::RemoteRead(e)));
            }
        }
        Ok(self.list_subscriptions(user_id))
    }

    pub fn is_subscribed(&self, user_id: Uuid, zip: &ZipCode) -> bool {
        self.cache
            .read()
            .get(&user_id)
            .and_then(|cached| cached.record.as_ref())
            .map(|record| record.contains(zip))
            .unwrap_or(false)
    }

    /// Add `zip` to the user's set. Subscribing twice leaves one entry.
    pub async fn subscribe(&self, user_id: Uuid, zip: &ZipCode) -> FeedResult<()> {
        match self.store.add_zip(user_id, zip).await {
            Ok(record) => {
                self.apply(user_id, record.version, Some(record));
                info!(%user_id, %zip, "subscribed");
                Ok(())
            }
            Err(e) => {
                error!(%user_id, %zip, error = %e, "failed to subscribe");
                Err(self.surface(FeedError::RemoteWrite(e)))
            }
        }
    }

    /// Remove `zip`; the stored record disappears with its last zip.
    pub async fn unsubscribe(&self, user_id: Uuid, zip: &ZipCode) -> FeedResult<()> {
        match self.store.remove_zip(user_id, zip).await {
            Ok(SubscriptionRemoval { remaining, version, .. }) => {
                let removed_record = remaining.is_none();
                self.apply(user_id, version, remaining);
                info!(%user_id, %zip, removed_record, "unsubscribed");
                Ok(())
            }
            Err(e) => {
                error!(%user_id, %zip, error = %e, "failed to unsubscribe");
                Err(self.surface(FeedError::RemoteWrite(e)))
            }
        }
    }

    /// Cached zips for display, in ascending order.
    pub fn list_subscriptions(&self, user_id: Uuid) -> Vec<ZipCode> {
        self.cache
            .read()
            .get(&user_id)
            .and_then(|cached| cached.record.as_ref())
            .map(Subscription::to_list)
            .unwrap_or_default()
    }

    pub fn take_notice(&self) -> Option<String> {
        self.notice.lock().take()
    }

    fn apply(&self, user_id: Uuid, version: i64, record: Option<Subscription>) {
        let mut cache = self.cache.write();
        match cache.get(&user_id) {
            Some(cached) if cached.version >= version => {
                debug!(
                    %user_id,
                    cached = cached.version,
                    received = version,
                    "ignoring stale subscription result"
                );
            }
            _ => {
                cache.insert(user_id, CachedSubscription { version, record });
            }
        }
    }

    fn surface(&self, err: FeedError) -> FeedError {
        *self.notice.lock() = Some(err.user_message());
        err
    }
}
