//! Remote document store seam.
//!
//! Three logical collections: `posts` (queried by zip), `users` (point reads
//! for author names) and `subscriptions` (keyed by user id). Both backends
//! enforce post authorship and apply subscription set changes atomically.

mod memory;
mod postgres;

pub use memory::InMemoryStore;
pub use postgres::PgStore;

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::config::{Config, StoreBackend};
use crate::error::StoreResult;
use crate::models::{
    NewPost, Post, PostUpdate, Subscription, SubscriptionRemoval, UserProfile, ZipCode,
};

/// Access to the `posts` collection.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PostStore: Send + Sync {
    /// Persist a new post; the store assigns the id.
    async fn insert_post(&self, post: NewPost) -> StoreResult<Post>;

    /// All posts whose zip equals `zip`.
    async fn posts_by_zip(&self, zip: &ZipCode) -> StoreResult<Vec<Post>>;

    /// Replace subject/body/link/timestamp and mark the post edited.
    ///
    /// Fails with `StoreError::NotAuthor` unless `author_id` owns the post.
    async fn replace_post(
        &self,
        post_id: Uuid,
        author_id: Uuid,
        update: PostUpdate,
    ) -> StoreResult<Post>;

    /// Delete a post. Fails with `StoreError::NotAuthor` unless `author_id` owns it.
    async fn delete_post(&self, post_id: Uuid, author_id: Uuid) -> StoreResult<()>;
}

/// Read access to the `users` collection.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get_profile(&self, user_id: Uuid) -> StoreResult<Option<UserProfile>>;
}

/// Access to the `subscriptions` collection.
///
/// `add_zip` and `remove_zip` are single atomic operations on the stored set,
/// so concurrent sessions for the same user cannot lose each other's changes.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    async fn get_subscription(&self, user_id: Uuid) -> StoreResult<Option<Subscription>>;

    /// Set-union `zip` into the user's record, creating the record if needed.
    async fn add_zip(&self, user_id: Uuid, zip: &ZipCode) -> StoreResult<Subscription>;

    /// Remove `zip`; deletes the record when the set becomes empty.
    ///
    /// The returned version is consumed even when no record remains.
    async fn remove_zip(&self, user_id: Uuid, zip: &ZipCode) -> StoreResult<SubscriptionRemoval>;
}

/// The three collections of one backend, as trait objects.
#[derive(Clone)]
pub struct FeedStore {
    pub posts: Arc<dyn PostStore>,
    pub profiles: Arc<dyn ProfileStore>,
    pub subscriptions: Arc<dyn SubscriptionStore>,
}

impl FeedStore {
    pub fn from_backend<S>(backend: Arc<S>) -> Self
    where
        S: PostStore + ProfileStore + SubscriptionStore + 'static,
    {
        Self {
            posts: backend.clone(),
            profiles: backend.clone(),
            subscriptions: backend,
        }
    }
}

/// Build the backend selected by configuration.
pub async fn connect_store(config: &Config) -> Result<FeedStore> {
    match config.store.backend {
        StoreBackend::Memory => {
            info!("Using in-memory document store");
            Ok(FeedStore::from_backend(Arc::new(InMemoryStore::new())))
        }
        StoreBackend::Postgres => {
            let db = config
                .database
                .as_ref()
                .context("DATABASE_URL must be set for the postgres store backend")?;
            let store = PgStore::connect(db)
                .await
                .context("Failed to connect to PostgreSQL")?;
            store
                .run_migrations()
                .await
                .context("Failed to run database migrations")?;
            info!("Using PostgreSQL document store");
            Ok(FeedStore::from_backend(Arc::new(store)))
        }
    }
}
