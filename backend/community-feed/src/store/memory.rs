use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use super::{PostStore, ProfileStore, SubscriptionStore};
use crate::error::{StoreError, StoreResult};
use crate::models::{
    NewPost, Post, PostUpdate, Subscription, SubscriptionRemoval, UserProfile, ZipCode,
};

/// Process-local document store.
///
/// Each collection sits behind its own lock; set changes on a subscription
/// happen under a single write guard.
#[derive(Default)]
pub struct InMemoryStore {
    posts: RwLock<HashMap<Uuid, Post>>,
    users: RwLock<HashMap<Uuid, UserProfile>>,
    subscriptions: RwLock<SubscriptionTable>,
}

#[derive(Default)]
struct SubscriptionTable {
    records: HashMap<Uuid, Subscription>,
    /// Versions are store-wide so a recreated record never reuses an old one.
    last_version: i64,
}

impl SubscriptionTable {
    fn next_version(&mut self) -> i64 {
        self.last_version += 1;
        self.last_version
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed or replace a user profile.
    pub async fn upsert_profile(&self, profile: UserProfile) {
        self.users.write().await.insert(profile.id, profile);
    }

    pub async fn get_post(&self, post_id: Uuid) -> Option<Post> {
        self.posts.read().await.get(&post_id).cloned()
    }

    pub async fn post_count(&self) -> usize {
        self.posts.read().await.len()
    }
}

#[async_trait]
impl PostStore for InMemoryStore {
    async fn insert_post(&self, post: NewPost) -> StoreResult<Post> {
        let post = post.into_post(Uuid::new_v4());
        self.posts.write().await.insert(post.id, post.clone());
        debug!(post_id = %post.id, zip = %post.zip, "post inserted");
        Ok(post)
    }

    async fn posts_by_zip(&self, zip: &ZipCode) -> StoreResult<Vec<Post>> {
        let posts = self.posts.read().await;
        let mut matching: Vec<Post> = posts.values().filter(|p| &p.zip == zip).cloned().collect();
        matching.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then(a.id.cmp(&b.id)));
        Ok(matching)
    }

    async fn replace_post(
        &self,
        post_id: Uuid,
        author_id: Uuid,
        update: PostUpdate,
    ) -> StoreResult<Post> {
        let mut posts = self.posts.write().await;
        let post = posts
            .get_mut(&post_id)
            .ok_or(StoreError::PostNotFound(post_id))?;
        if !post.is_authored_by(author_id) {
            return Err(StoreError::NotAuthor {
                post_id,
                user_id: author_id,
            });
        }
        update.apply_to(post);
        Ok(post.clone())
    }

    async fn delete_post(&self, post_id: Uuid, author_id: Uuid) -> StoreResult<()> {
        let mut posts = self.posts.write().await;
        match posts.get(&post_id) {
            None => Err(StoreError::PostNotFound(post_id)),
            Some(post) if !post.is_authored_by(author_id) => Err(StoreError::NotAuthor {
                post_id,
                user_id: author_id,
            }),
            Some(_) => {
                posts.remove(&post_id);
                Ok(())
            }
        }
    }
}

#[async_trait]
impl ProfileStore for InMemoryStore {
    async fn get_profile(&self, user_id: Uuid) -> StoreResult<Option<UserProfile>> {
        Ok(self.users.read().await.get(&user_id).cloned())
    }
}

#[async_trait]
impl SubscriptionStore for InMemoryStore {
    async fn get_subscription(&self, user_id: Uuid) -> StoreResult<Option<Subscription>> {
        Ok(self.subscriptions.read().await.records.get(&user_id).cloned())
    }

    async fn add_zip(&self, user_id: Uuid, zip: &ZipCode) -> StoreResult<Subscription> {
        let mut table = self.subscriptions.write().await;
        let version = table.next_version();
        let record = table
            .records
            .entry(user_id)
            .or_insert_with(|| Subscription {
                user_id,
                zips: BTreeSet::new(),
                version,
            });
        record.zips.insert(zip.clone());
        record.version = version;
        Ok(record.clone())
    }

    async fn remove_zip(&self, user_id: Uuid, zip: &ZipCode) -> StoreResult<SubscriptionRemoval> {
        let mut table = self.subscriptions.write().await;
        let version = table.next_version();
        let remaining = match table.records.get_mut(&user_id) {
            None => None,
            Some(record) => {
                record.zips.remove(zip);
                record.version = version;
                if record.zips.is_empty() {
                    None
                } else {
                    Some(record.clone())
                }
            }
        };
        if remaining.is_none() {
            table.records.remove(&user_id);
        }
        Ok(SubscriptionRemoval {
            user_id,
            remaining,
            version,
        })
    }
}
